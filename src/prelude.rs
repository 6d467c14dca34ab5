// Re-export commonly used items from submodules
pub use crate::agent::{Interactor, ViewDirection};
pub use crate::aggregator::{NotifyOutcome, ObserverAggregator};
pub use crate::config::*;
pub use crate::eligibility::{
    can_interact, evaluate, AgentView, AngleReading, Eligibility, LineOfSight, LineOfSightProvider, OpenSpace, RayHit,
    TargetView,
};
pub use crate::error::{Capability, InteractionError};
pub use crate::hold::{HoldInteraction, HoldPhase, HoldStep};
pub use crate::presentation::PresentationFlags;
pub use crate::puzzle::{
    FollowThroughGate, GateReset, PuzzleTrigger, RequirementsSatisfied, ResetGate, SetTriggerEnabled, TriggerActivated,
    TriggerGate,
};
pub use crate::registry::{Interactable, Subscription};
pub use crate::resolver::{InteractionResolver, Resolution};
pub use crate::subscription::SubscriptionSet;
pub use crate::{
    CanInteract, FirstSubscribed, HideMarker, HideNameLabel, HidePrompt, HideProgress, InteractIntent, Interacted,
    InteractionPlugin, InteractionSet, NoneLeft, RangeEvent, ShowMarker, ShowNameLabel, ShowProgress, ShowPrompt,
    Subscribed, TargetCleared, TargetSelected, Unsubscribed,
};
