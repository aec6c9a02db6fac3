//! MIME type detection for depot files.

use std::path::Path;

/// Detect the MIME type for a file on disk.
///
/// Magic-byte detection runs first and covers binary formats; text and
/// source files (which have no useful magic) fall back to an extension
/// table. Anything unrecognized is served as `application/octet-stream`.
pub fn detect(path: &Path) -> String {
    if let Some(kind) = infer::get_from_path(path).ok().flatten() {
        return kind.mime_type().to_string();
    }

    from_extension(path)
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Extension-based lookup for types `infer` cannot sniff.
fn from_extension(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    let mime = match extension.as_str() {
        // Text
        "txt" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "json" => "application/json",
        "yaml" | "yml" => "application/x-yaml",
        "toml" => "application/toml",

        // Source code
        "rs" => "text/x-rust",
        "js" => "text/javascript",
        "ts" => "text/typescript",
        "py" => "text/x-python",
        "go" => "text/x-go",
        "c" | "h" => "text/x-c",
        "java" => "text/x-java",
        "sh" | "bash" => "text/x-shellscript",
        "sql" => "text/x-sql",

        // Config
        "ini" | "cfg" | "conf" | "env" => "text/plain",

        // Media extensions infer misses without content
        "svg" => "image/svg+xml",

        _ => return None,
    };

    Some(mime)
}
