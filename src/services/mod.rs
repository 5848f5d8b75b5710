pub mod action_center;
pub mod checklist;
pub mod inspection;
pub mod matching;
pub mod session;
