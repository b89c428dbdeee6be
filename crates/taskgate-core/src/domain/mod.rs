//! Domain model (tasks, projects and areas, error taxonomy, input validation).

pub mod envelope;
pub mod errors;
pub mod project;
pub mod task;
pub mod validation;

pub use envelope::ListBody;
pub use errors::{ApiError, ErrorKind, TransportError, UpstreamError, ValidationError};
pub use project::{Area, AreaDetail, CreateProjectRequest, Project};
pub use task::{
    CompleteTaskRequest, CreateTaskRequest, HealthResponse, HealthStatus, Task, TaskId, TaskList,
    TaskStatus,
};
