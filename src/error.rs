use thiserror::Error;

/// Every failure the crate reports.
///
/// Module enums and third-party errors convert in through `From`, so `?` works across layers.
/// [`Context`](RoomPlanError::Context) wraps another error behind a message.
#[derive(Error, Debug)]
pub enum RoomPlanError {
    #[error("{message}: {cause}")]
    Context { message: String, cause: Box<RoomPlanError> },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    ParseInt(#[from] std::num::ParseIntError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    // Workbook containers
    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{0}")]
    Cfb(#[from] crate::helpers::cfb::CfbError),

    #[error("{0}")]
    Biff8(#[from] crate::helpers::biff8::Biff8Error),

    #[error("{0}")]
    Xml(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncoding(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    XmlText(#[from] crate::helpers::xml::XmlError),

    #[error("{0}")]
    Spreadsheet(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    Xls(#[from] crate::spreadsheet::xls::XlsError),

    #[error("{0}")]
    Upload(#[from] crate::service::UploadError),

    #[error("{0}")]
    Auth(#[from] crate::auth::AuthError),
}

pub(crate) trait ErrorContext<T> {
    /// Puts `message` in front of the error, e.g. `Parse error: …`
    fn context(self, message: impl Into<String>) -> Result<T, RoomPlanError>;
}

impl<T, E: Into<RoomPlanError>> ErrorContext<T> for Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T, RoomPlanError> {
        self.map_err(|e| RoomPlanError::Context {
            message: message.into(),
            cause: Box::new(e.into()),
        })
    }
}
