pub mod bank_service;
pub mod exam_service;
pub mod grading_service;
pub mod review_service;
pub mod token_service;

pub use bank_service::BankService;
pub use exam_service::ExamService;
pub use grading_service::GradingService;
pub use review_service::ReviewService;
pub use token_service::TokenService;
