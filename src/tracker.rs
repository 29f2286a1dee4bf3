//! The tracking façade: validate, build, deliver.
//!
//! One `Tracker` per property (account id + domain). It carries the
//! page-independent state (custom variables, campaign) and owns the
//! transport; the caller owns the `Visitor` and `Session`.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{Campaign, CustomVariable, Event, Page, Session, Transaction, Visitor};
use crate::net::{DeferredTransport, SocketTransport, Transport};
use crate::request::{self, Request};

fn account_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^UA-[0-9]*-[0-9]*$").expect("static pattern"))
}

pub struct Tracker {
    account_id: String,
    domain_name: String,
    config: Config,
    custom_variables: BTreeMap<u32, CustomVariable>,
    campaign: Option<Campaign>,
    /// Set by `track_custom_variable`, carried as `__utmv` afterwards.
    legacy_variable: Option<CustomVariable>,
    transport: Box<dyn Transport>,
}

impl Tracker {
    pub fn new(account_id: &str, domain_name: &str, config: Config) -> Result<Self> {
        if !account_id_pattern().is_match(account_id) {
            return Err(Error::configuration(format!(
                "{:?} is not a valid Google Analytics account ID",
                account_id
            )));
        }

        let socket = SocketTransport::new(&config);
        let transport: Box<dyn Transport> = if config.send_on_shutdown {
            Box::new(DeferredTransport::new(socket))
        } else {
            Box::new(socket)
        };

        log::debug!(
            "tracker {} for {} → {}",
            account_id,
            domain_name,
            config.endpoint_url()
        );

        Ok(Self {
            account_id: account_id.to_string(),
            domain_name: domain_name.to_string(),
            config,
            custom_variables: BTreeMap::new(),
            campaign: None,
            legacy_variable: None,
            transport,
        })
    }

    /// Replace the transport, e.g. with a queue or a test double.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Box::new(transport);
        self
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ─── Page-independent state ──────────────────────────────────────────

    /// Attach a custom variable to every following beacon. A variable with
    /// the same index replaces the previous one.
    pub fn add_custom_variable(&mut self, var: CustomVariable) -> Result<()> {
        var.validate()?;
        if let Some(index) = var.index {
            self.custom_variables.insert(index, var);
        }
        Ok(())
    }

    pub fn remove_custom_variable(&mut self, index: u32) -> Option<CustomVariable> {
        self.custom_variables.remove(&index)
    }

    /// Custom variables in index order.
    pub fn custom_variables(&self) -> impl Iterator<Item = &CustomVariable> {
        self.custom_variables.values()
    }

    pub fn set_campaign(&mut self, campaign: Option<Campaign>) -> Result<()> {
        if let Some(c) = &campaign {
            c.validate()?;
        }
        self.campaign = campaign;
        Ok(())
    }

    pub fn campaign(&self) -> Option<&Campaign> {
        self.campaign.as_ref()
    }

    pub fn legacy_variable(&self) -> Option<&CustomVariable> {
        self.legacy_variable.as_ref()
    }

    // ─── Tracking ────────────────────────────────────────────────────────

    pub fn track_pageview(
        &self,
        page: &Page,
        session: &mut Session,
        visitor: &mut Visitor,
    ) -> Result<()> {
        let request = request::build_pageview(self, page, session, visitor)?;
        self.send(&request);
        Ok(())
    }

    pub fn track_event(
        &self,
        event: &Event,
        session: &mut Session,
        visitor: &mut Visitor,
    ) -> Result<()> {
        let request = request::build_event(self, event, session, visitor)?;
        self.send(&request);
        Ok(())
    }

    /// One transaction beacon followed by one beacon per item. Nothing is
    /// sent unless the transaction and every item are valid.
    pub fn track_transaction(
        &self,
        transaction: &Transaction,
        session: &mut Session,
        visitor: &mut Visitor,
    ) -> Result<()> {
        transaction.validate()?;
        for item in transaction.items() {
            item.validate()?;
        }

        let mut requests = Vec::with_capacity(transaction.items().len() + 1);
        requests.push(request::build_transaction(self, transaction, session, visitor)?);
        for item in transaction.items() {
            requests.push(request::build_item(self, item, session, visitor)?);
        }

        for request in &requests {
            self.send(request);
        }
        Ok(())
    }

    /// Legacy `_setVar()` beacon. The variable keeps riding along as
    /// `__utmv` on later beacons.
    pub fn track_custom_variable(
        &mut self,
        var: CustomVariable,
        session: &mut Session,
        visitor: &mut Visitor,
    ) -> Result<()> {
        let request = request::build_custom_variable(self, &var, session, visitor)?;
        self.legacy_variable = Some(var);
        self.send(&request);
        Ok(())
    }

    fn send(&self, request: &Request) {
        match self.transport.deliver(request) {
            Ok(Some(response)) => {
                log::debug!("{} beacon answered ({} bytes)", request.kind, response.len())
            }
            Ok(None) => {}
            Err(e) => log::warn!(
                "{} beacon to {} not delivered: {}",
                request.kind,
                self.config.endpoint_url(),
                e
            ),
        }
    }
}
