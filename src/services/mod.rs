// 服务层模块
pub mod action_executor;
pub mod action_invoker;
pub mod action_poller;
pub mod domain_directory;
pub mod error_classifier;
pub mod idg_client;
pub mod result_normalizer;
pub mod transport;

pub use action_executor::{ActionCompletion, ActionExecutor};
pub use action_invoker::ActionInvoker;
pub use action_poller::ActionPoller;
pub use domain_directory::DomainDirectory;
pub use error_classifier::{Classification, ErrorClassifier, ErrorContext};
pub use idg_client::IdgClient;
pub use transport::Transport;
