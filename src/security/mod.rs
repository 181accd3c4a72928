pub mod authority;
pub mod classifier;
pub mod context;
pub mod decision;
pub mod gate;
pub mod principal;
pub mod store;

pub use authority::{TokenAuthority, TokenError};
pub use classifier::{Classification, RouteClassifier, RouteRule};
pub use context::{AuthDetails, SecurityContext};
pub use decision::AccessDecision;
pub use gate::{AuthenticationGate, GateOutcome, RequestMeta};
pub use principal::{Credential, Identity, Principal};
pub use store::{PrincipalStore, StoreError};
