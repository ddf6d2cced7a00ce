use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resource types the decision engine can refine against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A tracked project.
    Project,
    /// A task inside a project.
    Task,
    /// An uploaded file attached to a project or task.
    File,
    /// A user profile.
    User,
}

impl ResourceKind {
    /// Returns a stable label for logging and audit entries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Task => "task",
            Self::File => "file",
            Self::User => "user",
        }
    }
}

/// Instance a request targets, when one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTarget {
    /// Kind of the targeted resource.
    pub kind: ResourceKind,
    /// Identifier of the targeted instance.
    pub id: Uuid,
}

/// Contextual facts about a caller's relationship to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectContext {
    /// Project instance identifier.
    pub project_id: Uuid,
    /// Caller holds an active responsibility for the project, under any
    /// responsibility tag.
    pub is_responsible: bool,
}

/// Contextual facts about a caller's relationship to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskContext {
    /// Task instance identifier.
    pub task_id: Uuid,
    /// Owning project identifier.
    pub project_id: Uuid,
    /// Task is assigned to the caller.
    pub is_assignee: bool,
    /// Caller is responsible for the owning project.
    pub is_project_responsible: bool,
}

/// Contextual facts about a caller's relationship to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContext {
    /// File instance identifier.
    pub file_id: Uuid,
    /// Owning project, resolved through the file's task when the file
    /// hangs off a task rather than a project directly.
    pub project_id: Option<Uuid>,
    /// Caller uploaded the file.
    pub is_uploader: bool,
    /// Caller is responsible for the owning project.
    pub is_project_responsible: bool,
}

/// Contextual facts about a caller's relationship to a user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserContext {
    /// Targeted user identifier.
    pub user_id: Uuid,
    /// Target is the caller's own profile.
    pub is_self: bool,
}

/// Per-request resource context computed fresh for every decision.
///
/// Never cached or persisted; the refinement predicates are OR'd, so one
/// applicable relationship is enough. That permissiveness is a deliberate
/// usability choice over strict least-privilege.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ResourceContext {
    /// Project instance context.
    Project(ProjectContext),
    /// Task instance context.
    Task(TaskContext),
    /// File instance context.
    File(FileContext),
    /// User profile context.
    User(UserContext),
    /// Synthesized context for creation, where no instance exists yet.
    Creation,
}

impl ResourceContext {
    /// Returns whether the caller satisfies at least one refinement
    /// predicate for the instance.
    #[must_use]
    pub fn grants_instance_access(&self) -> bool {
        match self {
            Self::Project(context) => context.is_responsible,
            Self::Task(context) => context.is_assignee || context.is_project_responsible,
            Self::File(context) => context.is_uploader || context.is_project_responsible,
            Self::User(context) => context.is_self,
            Self::Creation => true,
        }
    }
}
