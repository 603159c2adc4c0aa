use super::Diagnostic;

pub fn to_value(d: &Diagnostic) -> serde_json::Value {
    let loc = &d.locator;
    let mut obj = serde_json::json!({
        "severity": "error",
        "kind": d.kind,
        "code": d.code(),
        "category": d.category(),
        "message": d.message,
        "location": {
            "file": loc.filename,
            "line": loc.line,
            "col": loc.column,
            "text": loc.line_text,
            "width": loc.width,
        },
        "notes": d.notes,
    });

    if let Some(s) = &d.suggestion {
        obj["suggestion"] = serde_json::Value::String(s.clone());
    }

    obj
}
