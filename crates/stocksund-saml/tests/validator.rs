//! End-to-end validation of assertions signed at test time.

use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Once;
use stocksund_dsig::DsigContext;
use stocksund_keys::{loader, CertificateStore};
use stocksund_saml::{ErrorKind, IssuerPolicy, SamlValidator, TrustConfig, ValidationResult};

const RSA_KEY: &[u8] = include_bytes!("fixtures/idp-rsa-key.pem");
const RSA_CERT: &[u8] = include_bytes!("fixtures/idp-rsa-cert.pem");
const EC_KEY: &[u8] = include_bytes!("fixtures/idp-ec-key.pem");
const EC_CERT: &[u8] = include_bytes!("fixtures/idp-ec-cert.pem");
const ROGUE_KEY: &[u8] = include_bytes!("fixtures/rogue-rsa-key.pem");
const ROGUE_CERT: &[u8] = include_bytes!("fixtures/rogue-rsa-cert.pem");
const STATIC_ASSERTION: &str = include_str!("fixtures/signed-assertion.xml");
const STATIC_RESPONSE: &str = include_str!("fixtures/signed-response.xml");

const RSA_SHA1: &str = "DD401A321D1B2150D9982A011D71055293620DDA";
const EC_SHA1: &str = "B5CFC172A3B8C53E1BEB3515019D1D8FA8DA288D";
const ROGUE_SHA1: &str = "619D3C01F51742BAB207FDB975EBBF6BAC248779";

const ISSUER: &str = "https://idp.example.org/saml";
const AUDIENCE: &str = "https://sp.example.com/";

const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
const ECDSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256";
const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

// Subject-confirmation values that must never surface.
const SECRET_ADDRESS: &str = "198.51.100.23";
const SECRET_REQUEST: &str = "_req-secret-91";
const SECRET_RECIPIENT: &str = "https://sp.example.com/secret-acs";

static LOGGING: Once = Once::new();

fn init_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn t(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, h, m, s).unwrap()
}

/// Inside the default window.
fn now() -> DateTime<Utc> {
    t(0, 30, 0)
}

struct Template {
    id: &'static str,
    issuer: Option<&'static str>,
    name_id: &'static str,
    not_before: Option<&'static str>,
    not_on_or_after: Option<&'static str>,
    audiences: Vec<Vec<&'static str>>,
    signature_method: &'static str,
    digest_method: &'static str,
    c14n: &'static str,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            id: "_t0k3n",
            issuer: Some(ISSUER),
            name_id: "alice@example.org",
            not_before: Some("2025-01-01T00:00:00Z"),
            not_on_or_after: Some("2025-01-01T01:00:00Z"),
            audiences: vec![vec![AUDIENCE]],
            signature_method: RSA_SHA256,
            digest_method: SHA256,
            c14n: EXC_C14N,
        }
    }
}

impl Template {
    fn xml(&self) -> String {
        let issuer = self
            .issuer
            .map(|i| format!("<saml:Issuer>{i}</saml:Issuer>"))
            .unwrap_or_default();
        let mut window = String::new();
        if let Some(nb) = self.not_before {
            window.push_str(&format!(r#" NotBefore="{nb}""#));
        }
        if let Some(noa) = self.not_on_or_after {
            window.push_str(&format!(r#" NotOnOrAfter="{noa}""#));
        }
        let restrictions: String = self
            .audiences
            .iter()
            .map(|r| {
                let inner: String = r
                    .iter()
                    .map(|a| format!("<saml:Audience>{a}</saml:Audience>"))
                    .collect();
                format!("<saml:AudienceRestriction>{inner}</saml:AudienceRestriction>")
            })
            .collect();
        format!(
            r##"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="{id}" IssueInstant="2025-01-01T00:00:00Z" Version="2.0">
  {issuer}
  <ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
    <ds:SignedInfo>
      <ds:CanonicalizationMethod Algorithm="{c14n}"/>
      <ds:SignatureMethod Algorithm="{sig}"/>
      <ds:Reference URI="#{id}">
        <ds:Transforms>
          <ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/>
          <ds:Transform Algorithm="{c14n}"/>
        </ds:Transforms>
        <ds:DigestMethod Algorithm="{digest}"/>
        <ds:DigestValue/>
      </ds:Reference>
    </ds:SignedInfo>
    <ds:SignatureValue/>
    <ds:KeyInfo><ds:X509Data><ds:X509Certificate/></ds:X509Data></ds:KeyInfo>
  </ds:Signature>
  <saml:Subject>
    <saml:NameID Format="urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress">{name}</saml:NameID>
    <saml:SubjectConfirmation Method="urn:oasis:names:tc:SAML:2.0:cm:bearer">
      <saml:SubjectConfirmationData Address="{addr}" InResponseTo="{req}" NotOnOrAfter="2025-01-01T00:05:00Z" Recipient="{recipient}"/>
    </saml:SubjectConfirmation>
  </saml:Subject>
  <saml:Conditions{window}>{restrictions}</saml:Conditions>
  <saml:AttributeStatement>
    <saml:Attribute Name="groups"><saml:AttributeValue>staff</saml:AttributeValue></saml:Attribute>
  </saml:AttributeStatement>
</saml:Assertion>"##,
            id = self.id,
            c14n = self.c14n,
            sig = self.signature_method,
            digest = self.digest_method,
            name = self.name_id,
            addr = SECRET_ADDRESS,
            req = SECRET_REQUEST,
            recipient = SECRET_RECIPIENT,
        )
    }

    fn signed_with(&self, key_pem: &[u8], cert_pem: &[u8]) -> String {
        let key = loader::load_private_pem(key_pem)
            .unwrap()
            .with_certificate(loader::cert_pem_to_der(cert_pem).unwrap());
        stocksund_dsig::sign(&DsigContext::new(key), &self.xml()).unwrap()
    }

    fn signed(&self) -> String {
        self.signed_with(RSA_KEY, RSA_CERT)
    }
}

fn encode(xml: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(xml)
}

fn store() -> CertificateStore {
    let mut store = CertificateStore::new();
    for pem in [RSA_CERT, EC_CERT, ROGUE_CERT] {
        store.add_pem(pem).unwrap();
    }
    store
}

fn config(thumbprint: &str) -> TrustConfig {
    TrustConfig::new("test-idp", thumbprint, AUDIENCE, IssuerPolicy::allow([ISSUER]))
}

fn validator() -> SamlValidator {
    init_logging();
    SamlValidator::new(config(RSA_SHA1), store())
}

fn reason(result: &ValidationResult) -> ErrorKind {
    result
        .reason()
        .unwrap_or_else(|| panic!("expected a rejection, got {result:?}"))
}

fn valid_name(result: &ValidationResult) -> &str {
    result
        .name()
        .unwrap_or_else(|| panic!("expected a valid result, got {result:?}"))
}

#[test]
fn rsa_signed_assertion_is_valid() {
    let token = encode(&Template::default().signed());
    let result = validator().validate_at(&token, now());
    assert_eq!(valid_name(&result), "alice@example.org");
}

#[test]
fn ecdsa_signed_assertion_is_valid() {
    let template = Template {
        signature_method: ECDSA_SHA256,
        ..Default::default()
    };
    let token = encode(&template.signed_with(EC_KEY, EC_CERT));
    let validator = SamlValidator::new(config(EC_SHA1), store());
    assert!(validator.validate_at(&token, now()).is_valid());
}

#[test]
fn sha1_and_inclusive_c14n_are_accepted() {
    let template = Template {
        signature_method: "http://www.w3.org/2000/09/xmldsig#rsa-sha1",
        digest_method: "http://www.w3.org/2000/09/xmldsig#sha1",
        c14n: "http://www.w3.org/TR/2001/REC-xml-c14n-20010315",
        ..Default::default()
    };
    let token = encode(&template.signed());
    assert!(validator().validate_at(&token, now()).is_valid());
}

#[test]
fn sha256_thumbprint_pins_the_same_certificate() {
    let sha256 = stocksund_keys::TrustedCertificate::from_pem(RSA_CERT)
        .unwrap()
        .sha256()
        .to_string()
        .to_lowercase();
    let validator = SamlValidator::new(config(&sha256), store());
    let token = encode(&Template::default().signed());
    assert!(validator.validate_at(&token, now()).is_valid());
}

#[test]
fn externally_signed_fixtures_are_valid() {
    let instant = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    for xml in [STATIC_ASSERTION, STATIC_RESPONSE] {
        let result = validator().validate_at(&encode(xml), instant);
        assert_eq!(valid_name(&result), "alice@example.org");
    }
}

#[test]
fn identity_includes_attributes() {
    let token = encode(&Template::default().signed());
    let identity = validator().validate_identity_at(&token, now()).unwrap();
    assert_eq!(identity.issuer.as_deref(), Some(ISSUER));
    assert_eq!(identity.attribute("groups"), Some(&["staff".to_owned()][..]));
}

#[test]
fn altered_signed_content_is_rejected() {
    let signed = Template::default().signed();
    let altered = signed.replace("alice@example.org", "alicf@example.org");
    assert_ne!(signed, altered);
    let result = validator().validate_at(&encode(&altered), now());
    assert_eq!(reason(&result), ErrorKind::SignatureInvalid);
}

#[test]
fn flipped_signature_byte_is_rejected() {
    let signed = Template::default().signed();
    let start = signed.find("<ds:SignatureValue>").unwrap() + "<ds:SignatureValue>".len();
    let mut bytes = signed.into_bytes();
    // Base64 'A' <-> 'B' keeps the text decodable but changes one bit.
    bytes[start] = if bytes[start] == b'A' { b'B' } else { b'A' };
    let flipped = String::from_utf8(bytes).unwrap();
    let result = validator().validate_at(&encode(&flipped), now());
    assert_eq!(reason(&result), ErrorKind::SignatureInvalid);
}

#[test]
fn window_boundaries() {
    let token = encode(&Template::default().signed());
    let v = validator();
    assert_eq!(reason(&v.validate_at(&token, t(1, 0, 0))), ErrorKind::TokenExpired);
    assert_eq!(reason(&v.validate_at(&token, t(0, 0, 0))), ErrorKind::TokenNotYetValid);
    assert!(v.validate_at(&token, t(0, 0, 1)).is_valid());
    assert!(v.validate_at(&token, t(0, 59, 59)).is_valid());
}

#[test]
fn missing_window_bound_is_malformed() {
    let template = Template {
        not_before: None,
        ..Default::default()
    };
    let result = validator().validate_at(&encode(&template.signed()), now());
    assert_eq!(reason(&result), ErrorKind::MalformedToken);
}

#[test]
fn audience_in_second_restriction_is_enough() {
    let template = Template {
        audiences: vec![vec!["https://other.example/"], vec!["urn:x", AUDIENCE]],
        ..Default::default()
    };
    assert!(validator().validate_at(&encode(&template.signed()), now()).is_valid());
}

#[test]
fn foreign_audience_is_rejected() {
    let template = Template {
        audiences: vec![vec!["https://other.example/"]],
        ..Default::default()
    };
    let result = validator().validate_at(&encode(&template.signed()), now());
    assert_eq!(reason(&result), ErrorKind::AudienceMismatch);
}

#[test]
fn empty_issuer_list_accepts_any_issuer() {
    let template = Template {
        issuer: Some("https://somewhere-else.example/"),
        ..Default::default()
    };
    let token = encode(&template.signed());

    let strict = validator().validate_at(&token, now());
    assert_eq!(reason(&strict), ErrorKind::IssuerMismatch);

    let open = SamlValidator::new(
        TrustConfig::new("test-idp", RSA_SHA1, AUDIENCE, IssuerPolicy::AnyIssuer),
        store(),
    );
    assert!(open.validate_at(&token, now()).is_valid());
}

#[test]
fn stages_run_in_order() {
    // Wrong issuer and expired: issuer is checked first.
    let template = Template {
        issuer: Some("https://wrong.example/"),
        audiences: vec![vec!["https://other.example/"]],
        ..Default::default()
    };
    let token = encode(&template.signed());
    let late = t(5, 0, 0);
    assert_eq!(reason(&validator().validate_at(&token, late)), ErrorKind::IssuerMismatch);

    // Audience before time.
    let template = Template {
        audiences: vec![vec!["https://other.example/"]],
        ..Default::default()
    };
    let token = encode(&template.signed());
    assert_eq!(reason(&validator().validate_at(&token, late)), ErrorKind::AudienceMismatch);

    // A broken signature hides every semantic problem.
    let template = Template {
        issuer: Some("https://wrong.example/"),
        ..Default::default()
    };
    let tampered = template.signed().replace("alice@", "mallory@");
    assert_eq!(
        reason(&validator().validate_at(&encode(&tampered), late)),
        ErrorKind::SignatureInvalid
    );
}

#[test]
fn subject_confirmation_never_leaks() {
    let signed = Template::default().signed();
    let tokens = [
        encode(&signed),
        encode(&signed.replace("alice@", "eve@")),
        encode(&Template { audiences: vec![vec!["urn:nope"]], ..Default::default() }.signed()),
    ];
    let v = validator();
    for token in &tokens {
        for instant in [now(), t(0, 0, 0), t(2, 0, 0)] {
            let rendered = match v.validate_at(token, instant) {
                ValidationResult::Valid { name } => name,
                ValidationResult::Invalid { detail, .. } => detail,
            };
            for secret in [SECRET_ADDRESS, SECRET_REQUEST, SECRET_RECIPIENT] {
                assert!(!rendered.contains(secret), "{secret} leaked in {rendered}");
            }
            assert!(!rendered.contains(token.as_str()));
        }
        if let Ok(identity) = v.validate_identity_at(token, now()) {
            let dump = format!("{identity:?}");
            assert!(!dump.contains(SECRET_ADDRESS));
            assert!(!dump.contains(SECRET_REQUEST));
            assert!(!dump.contains(SECRET_RECIPIENT));
        }
    }
}

#[test]
fn unparseable_subject_confirmation_never_leaks() {
    let xml = Template::default().xml().replace(
        &format!(r#"Address="{SECRET_ADDRESS}""#),
        &format!(r#"Address="&x{SECRET_ADDRESS};""#),
    );
    assert!(xml.contains(&format!("&x{SECRET_ADDRESS};")));
    let result = validator().validate_at(&encode(&xml), now());
    let ValidationResult::Invalid { reason, detail } = result else {
        panic!("expected a rejection, got {result:?}");
    };
    assert_eq!(reason, ErrorKind::MalformedToken);
    for secret in [SECRET_ADDRESS, SECRET_REQUEST, SECRET_RECIPIENT] {
        assert!(!detail.contains(secret), "{secret} leaked in {detail}");
    }
}

#[test]
fn malformed_inputs() {
    let v = validator();
    let tokens = vec![
        String::new(),
        "   ".to_owned(),
        "%%%".to_owned(),
        "PHNhbWw=x".to_owned(),
        encode("not xml at all"),
        encode("<unrelated/>"),
        encode(r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion""#),
    ];
    for token in &tokens {
        let result = v.validate_at(token, now());
        assert_eq!(reason(&result), ErrorKind::MalformedToken, "token {token:?}");
    }
}

#[test]
fn rogue_signer_is_rejected() {
    // Same subject name, different key, its own certificate embedded.
    let token = encode(&Template::default().signed_with(ROGUE_KEY, ROGUE_CERT));
    let result = validator().validate_at(&token, now());
    assert_eq!(reason(&result), ErrorKind::SignatureInvalid);

    // Rogue key with the legitimate certificate embedded.
    let token = encode(&Template::default().signed_with(ROGUE_KEY, RSA_CERT));
    let result = validator().validate_at(&token, now());
    assert_eq!(reason(&result), ErrorKind::SignatureInvalid);

    // Trusting the rogue certificate makes the same token acceptable, so
    // the failures above come from the pin.
    let rogue_trusting = SamlValidator::new(config(ROGUE_SHA1), store());
    let token = encode(&Template::default().signed_with(ROGUE_KEY, ROGUE_CERT));
    assert!(rogue_trusting.validate_at(&token, now()).is_valid());
}

#[test]
fn unsigned_assertion_is_rejected() {
    let xml = Template::default().xml();
    let start = xml.find("<ds:Signature").unwrap();
    let end = xml.find("</ds:Signature>").unwrap() + "</ds:Signature>".len();
    let unsigned = format!("{}{}", &xml[..start], &xml[end..]);
    let result = validator().validate_at(&encode(&unsigned), now());
    assert_eq!(reason(&result), ErrorKind::SignatureInvalid);
}

#[test]
fn wrapped_assertion_is_rejected() {
    let legit = Template::default().signed();
    let evil = legit
        .replace("alice@example.org", "mallory@example.org")
        .replace(r#"ID="_t0k3n""#, r#"ID="_evil""#);

    // Evil assertion first, legitimate one tucked inside a response.
    let wrapped = format!(
        r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_r">{evil}<samlp:Extensions>{legit}</samlp:Extensions></samlp:Response>"#
    );
    let result = validator().validate_at(&encode(&wrapped), now());
    assert!(!result.is_valid());

    // Signature transplanted onto an assertion it does not reference.
    let result = validator().validate_at(&encode(&evil), now());
    assert_eq!(reason(&result), ErrorKind::SignatureInvalid);
}

#[test]
fn duplicate_ids_are_rejected() {
    let legit = Template::default().signed();
    let doubled = format!(
        r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_t0k3n">{legit}</samlp:Response>"#
    );
    let result = validator().validate_at(&encode(&doubled), now());
    assert_eq!(reason(&result), ErrorKind::SignatureInvalid);
    if let ValidationResult::Invalid { detail, .. } = result {
        assert!(detail.contains("duplicate"), "{detail}");
    }
}

#[test]
fn unknown_thumbprint_is_untrusted() {
    let token = encode(&Template::default().signed());
    let v = SamlValidator::new(config(&"AB".repeat(20)), store());
    assert_eq!(reason(&v.validate_at(&token, now())), ErrorKind::UntrustedIssuer);

    let empty = SamlValidator::new(config(RSA_SHA1), CertificateStore::new());
    assert_eq!(reason(&empty.validate_at(&token, now())), ErrorKind::UntrustedIssuer);
}

#[test]
fn empty_audience_is_configuration_error() {
    let token = encode(&Template::default().signed());
    let mut cfg = config(RSA_SHA1);
    cfg.audience.clear();
    let v = SamlValidator::new(cfg, store());
    assert_eq!(reason(&v.validate_at(&token, now())), ErrorKind::ConfigurationError);
}

#[test]
fn config_loaded_from_json_validates() {
    let json = format!(
        r#"{{"name":"json-idp","certificateThumbprint":"{RSA_SHA1}","validIssuers":["{ISSUER}"],"audience":"{AUDIENCE}"}}"#
    );
    let cfg = TrustConfig::from_json_str(&json).unwrap();
    cfg.check().unwrap();
    let token = encode(&Template::default().signed());
    assert!(SamlValidator::new(cfg, store()).validate_at(&token, now()).is_valid());
}

#[test]
fn store_loaded_from_fixture_directory() {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");
    let store = CertificateStore::load_dir(dir).unwrap();
    let token = encode(&Template::default().signed());
    assert!(SamlValidator::new(config(RSA_SHA1), store).validate_at(&token, now()).is_valid());
}

#[test]
fn results_are_idempotent() {
    let token = encode(&Template::default().signed());
    let v = validator();
    let first = v.validate_at(&token, now());
    for _ in 0..5 {
        assert_eq!(v.validate_at(&token, now()), first);
    }
}

#[test]
fn concurrent_validation_matches_sequential() {
    let v = validator();
    let good = Template::default().signed();
    let tokens = vec![
        encode(&good),
        encode(&good.replace("alice@", "bob@")),
        encode(&Template { audiences: vec![vec!["urn:other"]], ..Default::default() }.signed()),
        encode(&Template::default().signed_with(ROGUE_KEY, ROGUE_CERT)),
        "garbage".to_owned(),
    ];
    let expected: Vec<_> = tokens.iter().map(|t| v.validate_at(t, now())).collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    tokens
                        .iter()
                        .map(|t| v.validate_at(t, now()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
