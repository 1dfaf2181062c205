use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Create config template if it doesn't exist
    let out_dir = env::var("OUT_DIR").unwrap_or_else(|_| "./".to_string());
    let template_path = Path::new(&out_dir).join("../../../config.template.toml");

    let template = r#"# TSIO Configuration Template
# Copy this file to 'config.toml' and fill in your actual values

# Transport stream packet size override (188, 192 or 204).
# Leave commented out to let the demuxer auto-detect.
# packet_size = 188
"#;

    let _ = fs::write(template_path, template);
    println!("cargo:rerun-if-changed=build.rs");
}
