pub mod checkin;
pub mod customer;
pub mod media;
pub mod plan;
pub mod visit;

pub use checkin::{Checkin, NewCheckin};
pub use customer::{Customer, CustomerPatch, NewCustomer};
pub use media::MediaRef;
pub use plan::{NewPlan, PlanPriority, PlanStatus, VisitPlan};
pub use visit::{CustomField, FieldType, NewVisit, Visit, VisitNotes};
