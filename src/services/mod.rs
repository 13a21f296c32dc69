pub mod auth_service;
pub use auth_service::{AuthError, AuthResult, AuthService, LoginRequest, RegisterRequest};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod decision_service;
pub use decision_service::{
    DecisionError, DecisionPayload, DecisionService, EvaluationPayload, ListParams,
};

pub mod decision_service_impl;
pub use decision_service_impl::SeaOrmDecisionService;

pub mod password_policy;
pub mod permissions;
pub use permissions::PermissionError;

pub mod validation;
pub use validation::FieldErrors;
