use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

/// Substitution context for script templates.
pub type RenderContext = BTreeMap<String, String>;

/// Renders an executable script from an ordered set of template files.
///
/// Templates are read and concatenated in the given order; order is
/// significant because the shared logging helper must precede the install
/// logic that calls its functions. Each `{{KEY}}` token is substituted from
/// the context. Tokens with no matching context key are left untouched; a
/// template referencing a key the caller never supplies is an authoring
/// error, not something handled here.
///
/// # Errors
///
/// Returns an error when a template file cannot be read.
pub fn render_script(template_paths: &[&Path], context: &RenderContext) -> Result<String> {
    let mut script = String::new();
    for path in template_paths {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        script.push_str(&apply_template(&contents, context));
    }
    Ok(script)
}

fn apply_template(template: &str, context: &RenderContext) -> String {
    let mut rendered = template.to_string();
    for (key, value) in context {
        rendered = rendered.replace(&format!("{{{{{key}}}}}"), value);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::tempdir;

    use super::*;

    fn write_template(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_header_precedes_install_body() {
        let dir = tempdir().unwrap();
        let header = write_template(dir.path(), "_logger.sh", "__process_msg() { echo \"$1\"; }\n");
        let install = write_template(dir.path(), "install.sh", "__process_msg \"installing {{RELEASE}}\"\n");

        let mut context = RenderContext::new();
        context.insert("RELEASE".to_string(), "v1".to_string());

        let script = render_script(&[&header, &install], &context).unwrap();

        assert!(script.contains("installing v1"));
        let header_pos = script.find("__process_msg()").unwrap();
        let body_pos = script.find("installing").unwrap();
        assert!(header_pos < body_pos);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let dir = tempdir().unwrap();
        let tpl = write_template(dir.path(), "a.sh", "echo {{A}} {{B}}\n");

        let mut context = RenderContext::new();
        context.insert("A".to_string(), "1".to_string());
        context.insert("B".to_string(), "2".to_string());

        let first = render_script(&[&tpl], &context).unwrap();
        let second = render_script(&[&tpl], &context).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "echo 1 2\n");
    }

    #[test]
    fn test_unknown_token_is_left_untouched() {
        let context = RenderContext::new();
        let rendered = apply_template("echo {{MISSING}}", &context);
        assert_eq!(rendered, "echo {{MISSING}}");
    }

    #[test]
    fn test_missing_template_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.sh");
        let err = render_script(&[missing.as_path()], &RenderContext::new()).unwrap_err();
        assert!(err.to_string().contains("Failed to read template"));
    }
}
