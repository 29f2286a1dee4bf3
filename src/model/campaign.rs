//! Traffic-source attribution, carried in the `__utmz` cookie fragment.

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    /// `utmcsr`, required.
    pub source: Option<String>,
    /// `utmccn`
    pub name: Option<String>,
    /// `utmcmd`
    pub medium: Option<String>,
    /// `utmctr`
    pub term: Option<String>,
    /// `utmcct`
    pub content: Option<String>,
    /// `utmcid`
    pub id: Option<String>,
    /// AdWords click id, `utmgclid`.
    pub g_click_id: Option<String>,
    /// DoubleClick click id, `utmdclid`.
    pub d_click_id: Option<String>,
    pub creation_time: DateTime<Utc>,
    /// Number of times this campaign brought the visitor in.
    pub response_count: u32,
}

impl Campaign {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            name: None,
            medium: None,
            term: None,
            content: None,
            id: None,
            g_click_id: None,
            d_click_id: None,
            creation_time: Utc::now(),
            response_count: 1,
        }
    }

    fn typed(label: &str, medium: &str) -> Self {
        let mut campaign = Self::new(label);
        campaign.name = Some(label.to_string());
        campaign.medium = Some(medium.to_string());
        campaign
    }

    /// Visitor typed the address or used a bookmark.
    pub fn direct() -> Self {
        Self::typed("(direct)", "(none)")
    }

    pub fn organic(search_engine: impl Into<String>, term: impl Into<String>) -> Self {
        let mut campaign = Self::typed("(organic)", "organic");
        campaign.source = Some(search_engine.into());
        campaign.term = Some(term.into());
        campaign
    }

    /// Referral from another site: source is the referrer host, content its path.
    pub fn from_referrer(referrer: &str) -> Result<Self> {
        let url = Url::parse(referrer)
            .map_err(|e| Error::validation(format!("Invalid referrer {:?}: {}", referrer, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::validation(format!("Referrer {:?} has no host", referrer)))?;

        let mut campaign = Self::typed("(referral)", "referral");
        campaign.source = Some(host.to_string());
        campaign.content = Some(url.path().to_string());
        Ok(campaign)
    }

    /// Read `utm_*`, `gclid` and `dclid` off a landing page URL.
    /// Returns `None` when the URL carries no campaign parameters.
    pub fn from_landing_url(landing: &str) -> Result<Option<Self>> {
        let url = Url::parse(landing)
            .map_err(|e| Error::validation(format!("Invalid landing URL {:?}: {}", landing, e)))?;

        let mut campaign = Self::new("");
        campaign.source = None;
        let mut found = false;

        for (key, value) in url.query_pairs() {
            let slot = match key.as_ref() {
                "utm_source" => &mut campaign.source,
                "utm_campaign" => &mut campaign.name,
                "utm_medium" => &mut campaign.medium,
                "utm_term" => &mut campaign.term,
                "utm_content" => &mut campaign.content,
                "utm_id" => &mut campaign.id,
                "gclid" => &mut campaign.g_click_id,
                "dclid" => &mut campaign.d_click_id,
                _ => continue,
            };
            *slot = Some(value.into_owned());
            found = true;
        }

        if !found {
            return Ok(None);
        }
        // ga.js attributes bare AdWords clicks to google/cpc
        if campaign.source.is_none() && campaign.g_click_id.is_some() {
            campaign.source = Some("google".to_string());
            campaign.medium.get_or_insert_with(|| "cpc".to_string());
        }
        Ok(Some(campaign))
    }

    pub fn increase_response_count(&mut self) {
        self.response_count = self.response_count.saturating_add(1);
    }

    /// First response for this campaign (`utmcn`); later ones are `utmcr`.
    pub fn is_new(&self) -> bool {
        self.response_count <= 1
    }

    pub fn validate(&self) -> Result<()> {
        match self.source.as_deref() {
            Some(s) if !s.is_empty() => Ok(()),
            _ => Err(Error::validation(
                "Campaigns need to have at least the \"source\" attribute defined.",
            )),
        }
    }

    /// The `key=value|…` tail of `__utmz`. Only spaces and pluses are
    /// escaped here; the whole cookie is percent-encoded later.
    pub fn utmz_data(&self) -> String {
        let fields = [
            ("utmcid", &self.id),
            ("utmcsr", &self.source),
            ("utmgclid", &self.g_click_id),
            ("utmdclid", &self.d_click_id),
            ("utmccn", &self.name),
            ("utmcmd", &self.medium),
            ("utmctr", &self.term),
            ("utmcct", &self.content),
        ];

        fields
            .iter()
            .filter_map(|(key, value)| match value.as_deref() {
                Some(v) if !v.is_empty() => Some(format!("{}={}", key, v.replace(['+', ' '], "%20"))),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("|")
    }
}
