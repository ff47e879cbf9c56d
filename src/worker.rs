//! Worker offload: CPU-bound recipe tasks run on a dedicated thread and talk
//! to the async side only through messages.

pub mod channel;
pub mod pending;
pub mod protocol;
pub mod tasks;

pub use channel::WorkerChannel;
pub use pending::PendingTasks;
pub use protocol::{
    CostCalculationInput, CostInputItem, MatchIngredientsInput, PricedIngredient, TaskId,
    TaskKind, VariationBase, VariationInput, WorkerReply, WorkerRequest,
};
pub use tasks::{RecipeWorker, TaskHandler};
