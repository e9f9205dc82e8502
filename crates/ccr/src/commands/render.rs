//! Template rendering output

use crate::cli::CliError;
use ccr_secrets::SecretMapping;
use ccr_template::{Renderer, TemplateSpec};
use std::fs;

/// Render each template in order and write it to its destination.
///
/// Stops at the first failure. Templates before it stay written; the failing
/// template's destination is left untouched.
///
/// # Errors
///
/// Returns [`CliError::Io`] for unreadable sources or unwritable
/// destinations and [`CliError::Render`] for template failures.
pub fn render_templates(
    templates: &[TemplateSpec],
    secrets: &SecretMapping,
    renderer: &Renderer,
) -> Result<usize, CliError> {
    for spec in templates {
        let source = fs::read_to_string(&spec.source).map_err(|e| {
            CliError::io_with_help(
                format!("Could not open file {}: {e}", spec.source.display()),
                "Check file permissions and ensure the path exists",
            )
        })?;

        let name = spec.source.display().to_string();
        let rendered = renderer.render(&name, &source, secrets.iter())?;

        fs::write(&spec.destination, rendered).map_err(|e| {
            CliError::io_with_help(
                format!("Could not write {}: {e}", spec.destination.display()),
                "Check that the destination directory exists and is writable",
            )
        })?;
        tracing::info!(template = %spec, mode = ?renderer.mode(), "Rendered template");
    }
    Ok(templates.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccr_template::{RenderMode, RuntimeExtras};
    use tempfile::TempDir;

    fn secrets() -> SecretMapping {
        [("USER".to_string(), Some("admin".to_string()))]
            .into_iter()
            .collect()
    }

    fn renderer(mode: RenderMode) -> Renderer {
        Renderer::new(mode, &RuntimeExtras::new("192.168.1.20"))
    }

    #[test]
    fn test_renders_in_order() {
        let dir = TempDir::new().unwrap();
        let first = TemplateSpec::new(dir.path().join("a.j2"), dir.path().join("a.out"));
        let second = TemplateSpec::new(dir.path().join("b.j2"), dir.path().join("b.out"));
        fs::write(&first.source, "user={{ USER }}").unwrap();
        fs::write(&second.source, "bind={{ ccr_extras.local_addr }}").unwrap();

        let count = render_templates(
            &[first.clone(), second.clone()],
            &secrets(),
            &renderer(RenderMode::Strict),
        )
        .unwrap();

        assert_eq!(count, 2);
        assert_eq!(fs::read_to_string(&first.destination).unwrap(), "user=admin");
        assert_eq!(
            fs::read_to_string(&second.destination).unwrap(),
            "bind=192.168.1.20"
        );
    }

    #[test]
    fn test_stops_at_first_failure() {
        let dir = TempDir::new().unwrap();
        let good = TemplateSpec::new(dir.path().join("good.j2"), dir.path().join("good.out"));
        let bad = TemplateSpec::new(dir.path().join("bad.j2"), dir.path().join("bad.out"));
        let after = TemplateSpec::new(dir.path().join("after.j2"), dir.path().join("after.out"));
        fs::write(&good.source, "{{ USER }}").unwrap();
        fs::write(&bad.source, "{{ MISSING }}").unwrap();
        fs::write(&after.source, "{{ USER }}").unwrap();

        let err = render_templates(
            &[good.clone(), bad.clone(), after.clone()],
            &secrets(),
            &renderer(RenderMode::Strict),
        )
        .unwrap_err();

        assert!(err.to_string().contains("MISSING"));
        assert!(good.destination.exists());
        assert!(!bad.destination.exists());
        assert!(!after.destination.exists());
    }

    #[test]
    fn test_lenient_blank() {
        let dir = TempDir::new().unwrap();
        let spec = TemplateSpec::new(dir.path().join("l.j2"), dir.path().join("l.out"));
        fs::write(&spec.source, "a={{ MISSING }};").unwrap();

        render_templates(&[spec.clone()], &secrets(), &renderer(RenderMode::Lenient)).unwrap();
        assert_eq!(fs::read_to_string(&spec.destination).unwrap(), "a=;");
    }

    #[test]
    fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let spec = TemplateSpec::new(dir.path().join("none.j2"), dir.path().join("none.out"));
        let err =
            render_templates(&[spec], &secrets(), &renderer(RenderMode::Strict)).unwrap_err();
        assert!(matches!(err, CliError::Io { .. }));
    }
}
