pub mod answer;
pub mod attempt;
pub mod evaluation;
pub mod event;
pub mod result;
