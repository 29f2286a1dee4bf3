//! Beacon construction: entity → `ParameterSet` → query string → HTTP request.
//!
//! ```text
//! validate → base params → session hit → visitor params → custom vars (X10)
//!          → domain hash → cookies → type-specific params → GET request
//! ```
//!
//! Builders never touch the network. Apart from the session's track count
//! and a lazily generated visitor id, they have no side effects.

pub mod http;
pub mod parameters;

use std::fmt;

use crate::error::Result;
use crate::model::{CustomVariable, Event, Item, Page, Scope, Session, Transaction, Visitor};
use crate::tracker::Tracker;
use crate::util::{encode_uri_component, generate_hash, random32};
use crate::x10::{self, X10};

pub use http::Request;
pub use parameters::ParameterSet;

const X10_EVENT_PROJECT_ID: u32 = 5;
const X10_CUSTOMVAR_NAME_PROJECT_ID: u32 = 8;
const X10_CUSTOMVAR_VALUE_PROJECT_ID: u32 = 9;
const X10_CUSTOMVAR_SCOPE_PROJECT_ID: u32 = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeaconKind {
    Pageview,
    Event,
    Transaction,
    Item,
    /// Legacy `_setVar()` request, superseded by X10 custom variables.
    CustomVariable,
}

impl BeaconKind {
    /// Value of `utmt`; pageviews carry none.
    pub fn marker(self) -> Option<&'static str> {
        match self {
            BeaconKind::Pageview => None,
            BeaconKind::Event => Some("event"),
            BeaconKind::Transaction => Some("tran"),
            BeaconKind::Item => Some("item"),
            BeaconKind::CustomVariable => Some("var"),
        }
    }
}

impl fmt::Display for BeaconKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker().unwrap_or("page"))
    }
}

/// The entity a beacon reports.
#[derive(Debug, Clone, Copy)]
pub enum Beacon<'a> {
    Pageview(&'a Page),
    Event(&'a Event),
    Transaction(&'a Transaction),
    Item(&'a Item),
    CustomVariable(&'a CustomVariable),
}

impl Beacon<'_> {
    pub fn kind(&self) -> BeaconKind {
        match self {
            Beacon::Pageview(_) => BeaconKind::Pageview,
            Beacon::Event(_) => BeaconKind::Event,
            Beacon::Transaction(_) => BeaconKind::Transaction,
            Beacon::Item(_) => BeaconKind::Item,
            Beacon::CustomVariable(_) => BeaconKind::CustomVariable,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Beacon::Pageview(page) => page.validate(),
            Beacon::Event(event) => event.validate(),
            Beacon::Transaction(transaction) => transaction.validate(),
            Beacon::Item(item) => item.validate(),
            Beacon::CustomVariable(var) => var.validate(),
        }
    }
}

// ─── Builders ────────────────────────────────────────────────────────────────

pub fn build_pageview(
    tracker: &Tracker,
    page: &Page,
    session: &mut Session,
    visitor: &mut Visitor,
) -> Result<Request> {
    build(tracker, Beacon::Pageview(page), session, visitor)
}

pub fn build_event(
    tracker: &Tracker,
    event: &Event,
    session: &mut Session,
    visitor: &mut Visitor,
) -> Result<Request> {
    build(tracker, Beacon::Event(event), session, visitor)
}

/// The transaction beacon only; items are built separately.
pub fn build_transaction(
    tracker: &Tracker,
    transaction: &Transaction,
    session: &mut Session,
    visitor: &mut Visitor,
) -> Result<Request> {
    build(tracker, Beacon::Transaction(transaction), session, visitor)
}

pub fn build_item(
    tracker: &Tracker,
    item: &Item,
    session: &mut Session,
    visitor: &mut Visitor,
) -> Result<Request> {
    build(tracker, Beacon::Item(item), session, visitor)
}

pub fn build_custom_variable(
    tracker: &Tracker,
    var: &CustomVariable,
    session: &mut Session,
    visitor: &mut Visitor,
) -> Result<Request> {
    build(tracker, Beacon::CustomVariable(var), session, visitor)
}

/// Build one beacon. Fails before touching the session if the entity is
/// incomplete.
pub fn build(
    tracker: &Tracker,
    beacon: Beacon<'_>,
    session: &mut Session,
    visitor: &mut Visitor,
) -> Result<Request> {
    beacon.validate()?;

    let kind = beacon.kind();
    let mut p = base_parameters(tracker, kind);

    session.increase_track_count();
    p.hit_id = Some(session.session_id);

    visitor_parameters(&mut p, visitor);
    custom_variables_parameter(&mut p, tracker);

    let domain_hash = domain_hash(tracker);
    cookie_parameters(&mut p, tracker, session, visitor, domain_hash);

    match beacon {
        Beacon::Pageview(page) => pageview_parameters(&mut p, tracker, page),
        Beacon::Event(event) => event_parameters(&mut p, event),
        Beacon::Transaction(transaction) => transaction_parameters(&mut p, transaction),
        Beacon::Item(item) => item_parameters(&mut p, item),
        Beacon::CustomVariable(var) => p.utmv = Some(legacy_variable_cookie(domain_hash, var)),
    }
    p.assemble_cookies();

    let query = p.render();
    log::debug!(
        "built {} beacon for {} (session {}, hit #{}, {} byte query)",
        kind,
        tracker.account_id(),
        session.session_id,
        session.track_count,
        query.len()
    );

    let request = Request::render(
        kind,
        tracker.config(),
        query,
        visitor.user_agent.as_deref(),
        visitor.ip_address.as_deref(),
    );
    log::trace!("{}", request);
    Ok(request)
}

// ─── Shared steps ────────────────────────────────────────────────────────────

fn base_parameters(tracker: &Tracker, kind: BeaconKind) -> ParameterSet {
    let mut p = ParameterSet::new();
    p.account_id = Some(tracker.account_id().to_string());
    p.hostname = Some(tracker.domain_name().to_string());
    p.request_type = kind.marker();
    p.nonce = Some(random32());
    p.anonymize_ip = tracker.config().anonymize_ip_addresses;
    p
}

fn visitor_parameters(p: &mut ParameterSet, visitor: &Visitor) {
    p.locale = visitor.locale.as_ref().map(|l| l.to_lowercase());
    p.flash_version = visitor.flash_version.clone();
    p.java_enabled = visitor.java_enabled.unwrap_or(false);
    p.screen_color_depth = visitor.screen_color_depth;
    p.screen_resolution = visitor.screen_resolution.clone();
}

fn custom_variables_parameter(p: &mut ParameterSet, tracker: &Tracker) {
    let mut vars = tracker.custom_variables().peekable();
    if vars.peek().is_none() {
        return;
    }

    let mut x10 = X10::new();
    x10.clear_key(X10_CUSTOMVAR_NAME_PROJECT_ID);
    x10.clear_key(X10_CUSTOMVAR_VALUE_PROJECT_ID);
    x10.clear_key(X10_CUSTOMVAR_SCOPE_PROJECT_ID);

    for var in vars {
        let (Some(index), Some(name), Some(value)) = (var.index, &var.name, &var.value) else {
            continue;
        };
        x10.set_key(X10_CUSTOMVAR_NAME_PROJECT_ID, index, encode_uri_component(name));
        x10.set_key(X10_CUSTOMVAR_VALUE_PROJECT_ID, index, encode_uri_component(value));
        if var.scope != Scope::Page {
            x10.set_key(X10_CUSTOMVAR_SCOPE_PROJECT_ID, index, var.scope.code().to_string());
        }
    }

    p.append_extensible(&x10.render_url_string());
}

/// `1` when hashing is disabled, else the hash of the tracked domain.
fn domain_hash(tracker: &Tracker) -> i32 {
    if tracker.config().allow_hash {
        generate_hash(tracker.domain_name())
    } else {
        1
    }
}

fn cookie_parameters(
    p: &mut ParameterSet,
    tracker: &Tracker,
    session: &Session,
    visitor: &mut Visitor,
    domain_hash: i32,
) {
    p.utma = Some(format!(
        "{}.{}.{}.{}.{}.{}",
        domain_hash,
        visitor.unique_id(),
        visitor.first_visit_time.timestamp(),
        visitor.previous_visit_time.timestamp(),
        session.start_time.timestamp(),
        visitor.visit_count
    ));

    if let Some(campaign) = tracker.campaign() {
        p.utmz = Some(format!(
            "{}.{}.{}.{}.{}",
            domain_hash,
            campaign.creation_time.timestamp(),
            visitor.visit_count,
            campaign.response_count,
            campaign.utmz_data()
        ));
    }

    if let Some(var) = tracker.legacy_variable() {
        p.utmv = Some(legacy_variable_cookie(domain_hash, var));
    }
}

/// `__utmv` as written by `_setVar()`/`_setCustomVar()`: `hash.|i=name=value=scope`.
fn legacy_variable_cookie(domain_hash: i32, var: &CustomVariable) -> String {
    format!(
        "{}.|{}={}={}={}",
        domain_hash,
        var.index.unwrap_or(1),
        encode_uri_component(var.name.as_deref().unwrap_or("")),
        encode_uri_component(var.value.as_deref().unwrap_or("")),
        var.scope.code()
    )
}

// ─── Type-specific steps ─────────────────────────────────────────────────────

fn pageview_parameters(p: &mut ParameterSet, tracker: &Tracker, page: &Page) {
    p.page_path = page.path.clone();
    p.page_title = page.title.clone();
    p.charset = page.charset.clone();
    p.referrer = page.referrer.clone();

    if let Some(campaign) = tracker.campaign() {
        if campaign.is_new() {
            p.campaign_new = true;
        } else {
            p.campaign_repeat = true;
        }
    }
}

fn event_parameters(p: &mut ParameterSet, event: &Event) {
    let mut x10 = X10::new();
    x10.clear_key(X10_EVENT_PROJECT_ID);
    x10.clear_value(X10_EVENT_PROJECT_ID);

    if let Some(category) = &event.category {
        x10.set_key(X10_EVENT_PROJECT_ID, x10::OBJECT_KEY_NUM, category.as_str());
    }
    if let Some(action) = &event.action {
        x10.set_key(X10_EVENT_PROJECT_ID, x10::TYPE_KEY_NUM, action.as_str());
    }
    if let Some(label) = &event.label {
        x10.set_key(X10_EVENT_PROJECT_ID, x10::LABEL_KEY_NUM, label.as_str());
    }
    if let Some(value) = event.value {
        x10.set_value(X10_EVENT_PROJECT_ID, x10::VALUE_VALUE_NUM, value.to_string());
    }

    p.append_extensible(&x10.render_url_string());
    p.non_interaction = event.non_interaction;
}

fn transaction_parameters(p: &mut ParameterSet, t: &Transaction) {
    p.order_id = t.order_id.clone();
    p.affiliation = t.affiliation.clone();
    p.total = t.total;
    p.tax = t.tax;
    p.shipping = t.shipping;
    p.city = t.city.clone();
    p.region = t.region.clone();
    p.country = t.country.clone();
    p.currency = t.currency.clone();
}

fn item_parameters(p: &mut ParameterSet, item: &Item) {
    p.order_id = item.order_id.clone();
    p.item_sku = item.sku.clone();
    p.item_name = item.name.clone();
    p.item_variation = item.variation.clone();
    p.item_price = item.price;
    p.item_quantity = item.quantity;
}
