//! Mounting and page configuration.

use serde_json::Value;

use super::Child;
use crate::error::{KohError, Result};
use crate::host::Document;
use crate::reactive::Runtime;

/// Attach `root` under the element whose `id` attribute is `id`.
pub fn mount(document: &Document, id: &str, root: &Child) -> Result<()> {
    let target = document
        .get_element_by_id(id)
        .ok_or_else(|| KohError::MountTargetNotFound(id.to_string()))?;

    tracing::debug!(mount_id = id, "mounting");
    root.attach(&target);
    Ok(())
}

/// Look up the configuration block for `module` under `selector`.
///
/// Scans the document's script elements whose type is the configured
/// module script type, in document order, and returns
/// `json[selector][module]` from the first one that has a truthy value
/// there. `null`, `false`, `0` and `""` count as missing. Scripts that are
/// not valid JSON are skipped.
pub fn parse_module(document: &Document, selector: &str, module: &str) -> Option<Value> {
    let script_type = Runtime::config().module_script_type;

    for script in document.scripts_of_type(&script_type) {
        let json: Value = match serde_json::from_str(&script.text_content()) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(%err, node = script.id().raw(), "skipping malformed module script");
                continue;
            }
        };

        match json.get(selector).and_then(|modules| modules.get(module)) {
            Some(config) if is_truthy(config) => return Some(config.clone()),
            _ => continue,
        }
    }
    None
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::script;
    use crate::config::RuntimeConfig;
    use serde_json::json;

    fn add_script(doc: &Document, script_type: &str, body: &str) {
        let script_type = script_type.to_string();
        script(children![
            Child::bind(move |el| el.set_attribute("type", script_type.clone())),
            body.to_string(),
        ])
        .build(doc.body());
    }

    #[test]
    fn mount_attaches_under_the_target() {
        let doc = Document::new();
        let app = doc.create_element("div");
        app.set_attribute("id", "app");
        doc.body().append_child(&app).unwrap();

        mount(&doc, "app", &Child::from("mounted")).unwrap();
        assert_eq!(app.text_content(), "mounted");
    }

    #[test]
    fn mount_reports_a_missing_target() {
        let doc = Document::new();
        let err = mount(&doc, "nowhere", &Child::from("x")).unwrap_err();
        assert_eq!(err, KohError::MountTargetNotFound("nowhere".to_string()));
    }

    #[test]
    fn parse_module_returns_the_first_match() {
        let doc = Document::new();
        add_script(&doc, "text/x-magento-init", "{ not json");
        add_script(&doc, "text/javascript", r##"{"#product": {"config": {"skip": true}}}"##);
        add_script(
            &doc,
            "text/x-magento-init",
            r##"{"#product": {"config": {"products": [1, 2]}}}"##,
        );
        add_script(
            &doc,
            "text/x-magento-init",
            r##"{"#product": {"config": {"products": [3]}}}"##,
        );

        assert_eq!(
            parse_module(&doc, "#product", "config"),
            Some(json!({"products": [1, 2]}))
        );
        assert_eq!(parse_module(&doc, "#product", "other"), None);
        assert_eq!(parse_module(&doc, "#missing", "config"), None);
    }

    #[test]
    fn parse_module_skips_falsy_entries() {
        let doc = Document::new();
        for falsy in ["null", "false", "0", "\"\""] {
            let body = format!(r##"{{"#cart": {{"config": {falsy}}}}}"##);
            add_script(&doc, "text/x-magento-init", &body);
        }
        add_script(&doc, "text/x-magento-init", r##"{"#cart": {"config": []}}"##);

        assert_eq!(parse_module(&doc, "#cart", "config"), Some(json!([])));
    }

    #[test]
    fn parse_module_honours_the_configured_script_type() {
        let doc = Document::new();
        add_script(&doc, "application/json", r#"{"main": {"app": 1}}"#);
        assert_eq!(parse_module(&doc, "main", "app"), None);

        Runtime::configure(RuntimeConfig {
            module_script_type: "application/json".to_string(),
            ..RuntimeConfig::default()
        });
        assert_eq!(parse_module(&doc, "main", "app"), Some(json!(1)));
        Runtime::configure(RuntimeConfig::default());
    }
}
