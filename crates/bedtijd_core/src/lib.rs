pub mod domain;
pub mod i18n;
pub mod ports;

pub use domain::{
    AuthSession, Entry, EntryPatch, EntryStatus, Language, NewQuestion, Preferences, Question,
    User,
};
pub use ports::{
    AuthService, EntryTableService, ObjectStorageService, PortError, PortResult,
    QuestionTableService, SessionEvent, SessionEventStream,
};
