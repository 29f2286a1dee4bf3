//! The sparse set of `__utm.gif` query parameters.
//!
//! Every field is optional. Unset fields are skipped entirely when rendering,
//! and flags render as `1` or not at all.

use url::form_urlencoded;

use crate::util::convert_to_uri_component_encoding;

/// Emulated ga.js version, sent as `utmwv`.
pub const CLIENT_VERSION: &str = "4.7.2";

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    /// `utmwv`
    pub version: String,
    /// `utmn`, per-request nonce
    pub nonce: Option<u32>,
    /// `utmhn`
    pub hostname: Option<String>,
    /// `utmt`, absent for pageviews
    pub request_type: Option<&'static str>,
    /// `utmac`
    pub account_id: Option<String>,
    /// `utmhid`
    pub hit_id: Option<u32>,
    /// `aip`
    pub anonymize_ip: bool,
    /// `utmcs`
    pub charset: Option<String>,
    /// `utmsr`
    pub screen_resolution: Option<String>,
    /// `utmsc`, rendered with a `-bit` suffix
    pub screen_color_depth: Option<u32>,
    /// `utmul`
    pub locale: Option<String>,
    /// `utmje`
    pub java_enabled: bool,
    /// `utmfl`
    pub flash_version: Option<String>,
    /// `utmdt`
    pub page_title: Option<String>,
    /// `utmp`
    pub page_path: Option<String>,
    /// `utmr`
    pub referrer: Option<String>,
    /// `utmcn`
    pub campaign_new: bool,
    /// `utmcr`
    pub campaign_repeat: bool,
    /// `utme`, X10 tokens
    pub extensible: Option<String>,
    /// `utmni`
    pub non_interaction: bool,
    /// `utmtid`
    pub order_id: Option<String>,
    /// `utmtst`
    pub affiliation: Option<String>,
    /// `utmtto`
    pub total: Option<f64>,
    /// `utmttx`
    pub tax: Option<f64>,
    /// `utmtsp`
    pub shipping: Option<f64>,
    /// `utmtci`
    pub city: Option<String>,
    /// `utmtrg`
    pub region: Option<String>,
    /// `utmtco`
    pub country: Option<String>,
    /// `utmcu`
    pub currency: Option<String>,
    /// `utmipc`
    pub item_sku: Option<String>,
    /// `utmipn`
    pub item_name: Option<String>,
    /// `utmiva`
    pub item_variation: Option<String>,
    /// `utmipr`
    pub item_price: Option<f64>,
    /// `utmiqt`
    pub item_quantity: Option<u32>,
    /// `utmcc`, see `assemble_cookies`
    pub cookies: Option<String>,

    // Cookie fragments, folded into `utmcc` and never sent as keys.
    pub utma: Option<String>,
    pub utmz: Option<String>,
    pub utmv: Option<String>,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            version: CLIENT_VERSION.to_string(),
            nonce: None,
            hostname: None,
            request_type: None,
            account_id: None,
            hit_id: None,
            anonymize_ip: false,
            charset: None,
            screen_resolution: None,
            screen_color_depth: None,
            locale: None,
            java_enabled: false,
            flash_version: None,
            page_title: None,
            page_path: None,
            referrer: None,
            campaign_new: false,
            campaign_repeat: false,
            extensible: None,
            non_interaction: false,
            order_id: None,
            affiliation: None,
            total: None,
            tax: None,
            shipping: None,
            city: None,
            region: None,
            country: None,
            currency: None,
            item_sku: None,
            item_name: None,
            item_variation: None,
            item_price: None,
            item_quantity: None,
            cookies: None,
            utma: None,
            utmz: None,
            utmv: None,
        }
    }
}

fn push<T: ToString>(pairs: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<T>) {
    if let Some(v) = value {
        pairs.push((key, v.to_string()));
    }
}

fn flag(pairs: &mut Vec<(&'static str, String)>, key: &'static str, set: bool) {
    if set {
        pairs.push((key, "1".to_string()));
    }
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an X10 token to `utme`. Empty tokens leave `utme` untouched.
    pub fn append_extensible(&mut self, token: &str) {
        if token.is_empty() {
            return;
        }
        self.extensible.get_or_insert_with(String::new).push_str(token);
    }

    /// Build `utmcc` from the cookie fragments:
    /// `__utma=…;+__utmz=…;+__utmv=…;`
    pub fn assemble_cookies(&mut self) {
        let cookies: Vec<String> = [("__utma", &self.utma), ("__utmz", &self.utmz), ("__utmv", &self.utmv)]
            .into_iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| format!("{}={};", name, v)))
            .collect();

        self.cookies = if cookies.is_empty() {
            None
        } else {
            Some(cookies.join("+"))
        };
    }

    /// Non-empty fields as `(key, value)`, in wire order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut p = Vec::with_capacity(24);

        p.push(("utmwv", self.version.clone()));
        push(&mut p, "utmn", &self.nonce);
        push(&mut p, "utmhn", &self.hostname);
        push(&mut p, "utmt", &self.request_type);
        push(&mut p, "utmac", &self.account_id);
        push(&mut p, "utmhid", &self.hit_id);
        flag(&mut p, "aip", self.anonymize_ip);
        push(&mut p, "utmcs", &self.charset);
        push(&mut p, "utmsr", &self.screen_resolution);
        push(&mut p, "utmsc", &self.screen_color_depth.map(|d| format!("{}-bit", d)));
        push(&mut p, "utmul", &self.locale);
        flag(&mut p, "utmje", self.java_enabled);
        push(&mut p, "utmfl", &self.flash_version);
        push(&mut p, "utmdt", &self.page_title);
        push(&mut p, "utmp", &self.page_path);
        push(&mut p, "utmr", &self.referrer);
        flag(&mut p, "utmcn", self.campaign_new);
        flag(&mut p, "utmcr", self.campaign_repeat);
        push(&mut p, "utme", &self.extensible);
        flag(&mut p, "utmni", self.non_interaction);
        push(&mut p, "utmtid", &self.order_id);
        push(&mut p, "utmtst", &self.affiliation);
        push(&mut p, "utmtto", &self.total);
        push(&mut p, "utmttx", &self.tax);
        push(&mut p, "utmtsp", &self.shipping);
        push(&mut p, "utmtci", &self.city);
        push(&mut p, "utmtrg", &self.region);
        push(&mut p, "utmtco", &self.country);
        push(&mut p, "utmcu", &self.currency);
        push(&mut p, "utmipc", &self.item_sku);
        push(&mut p, "utmipn", &self.item_name);
        push(&mut p, "utmiva", &self.item_variation);
        push(&mut p, "utmipr", &self.item_price);
        push(&mut p, "utmiqt", &self.item_quantity);
        push(&mut p, "utmcc", &self.cookies);

        p
    }

    /// The query string, escaped like `encodeURIComponent()`.
    pub fn render(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.to_pairs() {
            serializer.append_pair(key, &value);
        }
        convert_to_uri_component_encoding(&serializer.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(p: &ParameterSet) -> Vec<&'static str> {
        p.to_pairs().into_iter().map(|(k, _)| k).collect()
    }

    #[test]
    fn test_empty_set_only_has_version() {
        let p = ParameterSet::new();
        assert_eq!(p.render(), "utmwv=4.7.2");
    }

    #[test]
    fn test_unset_fields_never_rendered() {
        let mut p = ParameterSet::new();
        p.account_id = Some("UA-1-1".into());
        p.page_title = Some(String::new());
        let rendered = p.render();
        assert!(!rendered.contains("utmt="));
        assert!(!rendered.contains("aip"));
        assert!(!rendered.contains("utmje"));
        assert!(!rendered.contains("utmsc"));
        // An explicitly empty value is still a value
        assert!(rendered.ends_with("&utmdt="));
        assert_eq!(keys(&p), vec!["utmwv", "utmac", "utmdt"]);
    }

    #[test]
    fn test_flags_render_as_one() {
        let mut p = ParameterSet::new();
        p.anonymize_ip = true;
        p.java_enabled = true;
        let pairs = p.to_pairs();
        assert!(pairs.contains(&("aip", "1".to_string())));
        assert!(pairs.contains(&("utmje", "1".to_string())));
    }

    #[test]
    fn test_color_depth_suffix_and_numbers() {
        let mut p = ParameterSet::new();
        p.screen_color_depth = Some(24);
        p.total = Some(10.0);
        p.tax = Some(1.5);
        p.item_quantity = Some(3);
        let pairs = p.to_pairs();
        assert!(pairs.contains(&("utmsc", "24-bit".to_string())));
        assert!(pairs.contains(&("utmtto", "10".to_string())));
        assert!(pairs.contains(&("utmttx", "1.5".to_string())));
        assert!(pairs.contains(&("utmiqt", "3".to_string())));
    }

    #[test]
    fn test_render_uses_uri_component_escaping() {
        let mut p = ParameterSet::new();
        p.page_title = Some("Tom's (new) page!".into());
        p.page_path = Some("/a b".into());
        assert_eq!(
            p.render(),
            "utmwv=4.7.2&utmdt=Tom's%20(new)%20page!&utmp=%2Fa%20b"
        );
    }

    #[test]
    fn test_append_extensible() {
        let mut p = ParameterSet::new();
        p.append_extensible("");
        assert!(p.extensible.is_none());
        p.append_extensible("8(a)9(b)");
        p.append_extensible("5(c*d)");
        assert_eq!(p.extensible.as_deref(), Some("8(a)9(b)5(c*d)"));
        assert!(p.render().contains("utme=8(a)9(b)5(c*d)"));
    }

    #[test]
    fn test_assemble_cookies() {
        let mut p = ParameterSet::new();
        p.assemble_cookies();
        assert!(p.cookies.is_none());

        p.utma = Some("1.2.3.4.5.6".into());
        p.utmv = Some("1.|1=a=b=1".into());
        p.assemble_cookies();
        assert_eq!(
            p.cookies.as_deref(),
            Some("__utma=1.2.3.4.5.6;+__utmv=1.|1=a=b=1;")
        );
        assert!(!keys(&p).contains(&"__utma"));
        assert!(p
            .render()
            .ends_with("utmcc=__utma%3D1.2.3.4.5.6%3B%2B__utmv%3D1.%7C1%3Da%3Db%3D1%3B"));
    }
}
