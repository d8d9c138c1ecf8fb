mod catalog;
mod ids;
mod question;
mod response;
mod session;

pub use catalog::{CatalogError, QuestionCatalog};
pub use ids::{MAX_SESSION_ID_LEN, ParseIdError, QuestionId, ResponseKey, SessionId, SessionIdError};
pub use question::{
    Answer, AnswerParseError, Question, QuestionError, QuestionType, QuestionTypeParseError,
};
pub use response::QuizResponse;
pub use session::{
    CompletionReport, QuizSession, SessionProgress, SessionStateError, SessionSummary,
    SessionUpdate, SummaryError, completion_rate,
};
