// Pipeline orchestration — preprocessing through model fitting.

pub mod cancel;
pub mod run;

pub use cancel::CancellationToken;
pub use run::{run, run_with_fitter, PipelineOutput};
