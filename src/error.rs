use std::fmt;

#[derive(Debug)]
pub enum EngrossError {
    /// The rendering target could not be located by its identifier.
    ElementNotFound(String),
    /// The rendering target holds no non-whitespace text; nothing to paginate.
    EmptyContent,
    /// The rasterization capability rejected a color expression the
    /// sanitizer did not catch.
    UnsupportedColorFunction(String),
    /// Generic failure reported by the rasterization capability.
    RasterizationFailure(String),
    /// The injected storage port failed to read or write.
    Storage(String),
    Io(std::io::Error),
    /// Anything outside the taxonomy; the raw message is kept for diagnostics.
    Unknown(String),
}

impl fmt::Display for EngrossError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngrossError::ElementNotFound(id) => {
                write!(f, "rendering target '{}' not found", id)
            }
            EngrossError::EmptyContent => write!(f, "document has no text content"),
            EngrossError::UnsupportedColorFunction(value) => {
                write!(f, "unsupported color function: {}", value)
            }
            EngrossError::RasterizationFailure(message) => {
                write!(f, "rasterization failed: {}", message)
            }
            EngrossError::Storage(message) => write!(f, "storage error: {}", message),
            EngrossError::Io(err) => write!(f, "io error: {}", err),
            EngrossError::Unknown(message) => write!(f, "unexpected error: {}", message),
        }
    }
}

impl std::error::Error for EngrossError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngrossError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EngrossError {
    fn from(value: std::io::Error) -> Self {
        EngrossError::Io(value)
    }
}

impl EngrossError {
    /// User-facing message in the target locale, with a remediation hint
    /// where one exists.
    pub fn user_message(&self) -> String {
        match self {
            EngrossError::ElementNotFound(_) => {
                "PDF生成対象の要素が見つかりません。ページを再読み込みしてください。".to_string()
            }
            EngrossError::EmptyContent => {
                "契約書の内容が空です。PDFを生成できません。".to_string()
            }
            EngrossError::UnsupportedColorFunction(_) => {
                "ブラウザが新しいカラー関数をサポートしていません。\
                 Chrome、Firefox、Safariの最新版をご利用ください。"
                    .to_string()
            }
            EngrossError::RasterizationFailure(_) => {
                "PDF生成ライブラリのエラーが発生しました。ページを再読み込みして再試行してください。"
                    .to_string()
            }
            EngrossError::Storage(message) | EngrossError::Unknown(message) => {
                format!("PDF生成に失敗しました。詳細: {}", message)
            }
            EngrossError::Io(err) => format!("PDF生成に失敗しました。詳細: {}", err),
        }
    }
}

/// Maps a raw failure message from the rasterization capability into the
/// error taxonomy. Applied to the primary strategy's error once the
/// secondary strategy has also given up.
pub fn categorize_raster_error(message: &str) -> EngrossError {
    if message.contains("not found") {
        return EngrossError::ElementNotFound(message.to_string());
    }
    if message.contains("unsupported color function") || message.contains("okich") {
        return EngrossError::UnsupportedColorFunction(message.to_string());
    }
    if message.contains("canvas") || message.contains("raster") {
        return EngrossError::RasterizationFailure(message.to_string());
    }
    EngrossError::Unknown(message.to_string())
}
