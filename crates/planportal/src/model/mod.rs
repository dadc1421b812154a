pub mod assessment;
pub mod consultant;
pub mod document;
pub mod job;
pub mod kb;
pub mod property;
pub mod ticket;

pub use assessment::{Assessment, AssessmentKind, AssessmentStatus};
pub use consultant::{Consultant, ConsultantInput};
pub use document::{Document, DocumentMetadataInput, DocumentVersion, FileRef};
pub use job::{
    merge_patch, promote_legacy_completed_document, ConsultantAssignment, Job, JobDocument,
    JobRecord,
};
pub use kb::{KbArticle, KbArticleInput, KbAttachment, KbKind, KbSection};
pub use property::{Coordinates, PlanningLayer, PropertyData, EPI_NAME_ATTRIBUTE, LEP_LAYER};
pub use ticket::{
    ConsultantTicket, NewConsultantTicket, NewWorkTicket, TicketFilter, TicketStatus,
    WorkOrderFile, WorkTicket,
};
