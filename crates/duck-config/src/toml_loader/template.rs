//! Default TOML config template with inline documentation comments.

use std::fmt::Write;

/// Generate the default TOML config content with comments.
pub fn default_config_toml(models: &[(&str, &str)], default: &str) -> String {
    let mut out = String::from(
        "# duck-chat configuration\n\
         # Only override what you want to change -- missing fields use defaults.\n\
         \n\
         # Model used when --model is not given. Accepts a name or a wire id:\n",
    );
    let width = models.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, id) in models {
        let _ = writeln!(out, "#   {name:<width$}  {id}");
    }
    let _ = writeln!(out, "model = \"{default}\"");
    out.push_str(
        r##"
# Stream answers as they are generated.
# stream = false

# Submit input with Ctrl+D instead of Enter.
# multiline = false

[http]
# user_agent = "Mozilla/5.0 ..."
# connect_timeout_secs = 10   # 1-300
# timeout_secs = 120          # 1-3600, unset = no limit
"##,
    );
    out
}
