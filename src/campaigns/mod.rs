//! Campaigns — lifecycle, personalization, dispatch, and stats.

pub mod dispatch;
pub mod model;
pub mod personalize;
pub mod routes;
pub mod state;
pub mod stats;

pub use dispatch::{DispatchReport, Dispatcher};
pub use model::{
    Campaign, CampaignContact, CampaignStatus, CampaignUpdate, NewCampaign, RecipientStatus,
};
pub use personalize::{personalize, render_message, strip_html};
pub use state::CampaignAction;
pub use stats::{CampaignStats, summarize};
