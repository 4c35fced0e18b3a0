mod projection_worker;

pub use projection_worker::{ProjectionWorker, WorkerHandle};
