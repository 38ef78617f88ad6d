//! Route templates for span names and metric labels.

use uuid::Uuid;

#[derive(Debug, Clone)]
pub(super) struct RequestSpanName {
    pub(super) otel_path: String,
    pub(super) otel_span_name: String,
}

pub(super) fn request_span_name(method: &str, path: &str) -> RequestSpanName {
    let otel_path = route_template(path);
    let otel_span_name = format!("{method} {otel_path}");

    RequestSpanName {
        otel_path,
        otel_span_name,
    }
}

/// Replace identifier segments with the router's parameter names so every
/// order, item and product shares one label.
fn route_template(path: &str) -> String {
    let mut template = String::with_capacity(path.len());
    let mut previous = "";

    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        template.push('/');

        if Uuid::parse_str(segment).is_ok() {
            template.push_str(parameter_for(previous));
        } else {
            template.push_str(segment);
        }

        previous = segment;
    }

    if template.is_empty() {
        template.push('/');
    }

    template
}

fn parameter_for(collection: &str) -> &'static str {
    match collection {
        "orders" => "{order}",
        "items" => "{item}",
        "products" => "{product}",
        _ => "{uuid}",
    }
}
