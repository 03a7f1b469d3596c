//! Default File Templates
//!
//! Last-resort content for a create task when neither the plan nor the
//! surrounding text supplied any. Chosen by extension, then refined by the
//! directory convention the path follows (Next.js app router pages, React
//! components, API routes).

use crate::utils::paths::extension_of;

/// Template for `path`, or `None` when no sensible default exists
pub fn default_template(path: &str) -> Option<String> {
    let ext = extension_of(path)?;
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let stem = file_name.split('.').next().unwrap_or(file_name);
    let component = component_name(path, stem);

    let template = match ext.as_str() {
        "tsx" | "jsx" if is_route_handler(path, stem) => route_handler(),
        "tsx" | "jsx" if stem == "layout" => format!(
            "export default function {}({{ children }}{}) {{\n  return <>{{children}}</>;\n}}\n",
            component,
            if ext == "tsx" { ": { children: React.ReactNode }" } else { "" }
        ),
        "tsx" | "jsx" => format!(
            "export default function {}() {{\n  return (\n    <div>\n      <h1>{}</h1>\n    </div>\n  );\n}}\n",
            component,
            title_case(&component)
        ),
        "ts" | "js" | "mjs" | "cjs" if is_route_handler(path, stem) => route_handler(),
        "ts" | "js" | "mjs" => "export {};\n".to_string(),
        "cjs" => "module.exports = {};\n".to_string(),
        "css" | "scss" => format!("/* {} */\n", file_name),
        "json" => "{}\n".to_string(),
        "md" | "mdx" => format!("# {}\n", title_case(&component)),
        "html" => format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"UTF-8\">\n  <title>{}</title>\n</head>\n<body>\n</body>\n</html>\n",
            title_case(&component)
        ),
        "py" => format!("\"\"\"{}.\"\"\"\n", stem),
        "rs" => "\n".to_string(),
        "sh" => "#!/usr/bin/env sh\nset -e\n".to_string(),
        "yml" | "yaml" | "toml" | "txt" | "env" => String::new(),
        _ => return None,
    };
    Some(template)
}

fn is_route_handler(path: &str, stem: &str) -> bool {
    stem == "route" || path.starts_with("pages/api/") || path.contains("/pages/api/")
}

fn route_handler() -> String {
    "export async function GET() {\n  return Response.json({ ok: true });\n}\n".to_string()
}

/// Component name from the file stem, or from the parent directory for
/// `page`/`layout`/`index` files
fn component_name(path: &str, stem: &str) -> String {
    let base = if matches!(stem, "page" | "layout" | "index") {
        let parent = path
            .rsplit('/')
            .nth(1)
            .filter(|p| !p.starts_with('(') && !p.starts_with('['))
            .unwrap_or("home");
        let suffix = if stem == "layout" { "Layout" } else { "Page" };
        format!("{}{}", pascal_case(parent), suffix)
    } else {
        pascal_case(stem)
    };
    if base.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("Component{}", base)
    } else {
        base
    }
}

fn pascal_case(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// "HelloPage" -> "Hello Page"
fn title_case(pascal: &str) -> String {
    let mut out = String::new();
    for (i, c) in pascal.chars().enumerate() {
        if i > 0 && c.is_uppercase() {
            out.push(' ');
        }
        out.push(c);
    }
    out
}
