pub mod candidate;
pub mod decision;
pub mod point;
pub mod section;

pub use candidate::{BoundingBox, MarkCandidate, RejectedContour, RejectionReason};
pub use decision::{QuestionDecision, SectionSummary, SheetResult};
pub use point::Point;
pub use section::Section;
