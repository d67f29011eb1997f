//! Library-level tests of the full parse pipeline over text fixtures.

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use lopdf::encryption::crypt_filters::{Aes128CryptFilter, CryptFilter};
use lopdf::{dictionary, Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream};
use rust_decimal::Decimal;

use cas_parser::error::Result;
use cas_parser::ingest::{detect, PlainTextExtractor};
use cas_parser::{
    CancellationToken, CasParser, ErrorKind, EventSink, FormatType, NoopSink, ParseEvent,
};

fn fixture(name: &str) -> Vec<u8> {
    let path = format!(
        "{}/fixtures/statements/{name}",
        env!("CARGO_MANIFEST_DIR")
    );
    std::fs::read(&path).unwrap_or_else(|e| panic!("read {path}: {e}"))
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn text_parser() -> CasParser {
    CasParser::with_extractor(Box::new(PlainTextExtractor::new()), Arc::new(NoopSink))
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<ParseEvent>>,
}

impl EventSink for Recorder {
    fn emit(&self, event: &ParseEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[test]
fn cdsl_statement_totals() {
    let statement = text_parser().parse(&fixture("cdsl.txt"), None).unwrap();

    assert_eq!(statement.meta().cas_type, FormatType::Cdsl);
    let summary = statement.summary();
    assert_eq!(summary.total_value, dec("173456.78"));
    assert_eq!(summary.holdings_value, dec("123456.78"));
    assert_eq!(summary.mutual_funds_value, dec("50000"));
    assert_eq!(summary.holdings_count, 1);
    assert_eq!(summary.funds_count, 1);
    assert_eq!(summary.categories["Equity"], dec("123456.78"));

    assert_eq!(statement.investor().name.as_deref(), Some("ASHA RAO"));
    assert_eq!(statement.investor().tax_id.as_deref(), Some("ABCDE1234F"));

    let account = &statement.accounts()[0];
    assert_eq!(account.depository, "CDSL");
    assert_eq!(account.participant_id, "12345678");
    assert_eq!(account.client_id, "87654321");
    assert_eq!(account.holding_ids, vec![statement.holdings()[0].id.clone()]);
}

#[test]
fn cdsl_statement_serializes_canonical_shape() {
    let statement = text_parser().parse(&fixture("cdsl.txt"), None).unwrap();
    let json = serde_json::to_value(&statement).unwrap();

    assert_eq!(json["meta"]["casType"], "CDSL");
    assert_eq!(json["summary"]["totalValue"], "173456.78");
    assert_eq!(json["holdings"][0]["securityId"], "INE002A01018");
    assert_eq!(json["mutualFunds"][0]["folioNumber"], "1234567/89");
    assert!(json["accounts"][0]["holdingIds"].is_array());
    assert!(json["meta"]["trackingId"].is_string());
    assert!(json["meta"]["parsedAt"].is_string());
    assert_eq!(json["meta"]["parserVersion"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn nsdl_statement_totals() {
    let statement = text_parser().parse(&fixture("nsdl.txt"), None).unwrap();

    assert_eq!(statement.meta().cas_type, FormatType::Nsdl);
    assert_eq!(statement.accounts().len(), 1);
    assert_eq!(statement.accounts()[0].depository, "NSDL");
    assert_eq!(statement.accounts()[0].participant_id, "IN300126");

    let summary = statement.summary();
    assert_eq!(summary.holdings_count, 3);
    assert_eq!(summary.holdings_value, dec("185040.50"));
    assert_eq!(summary.mutual_funds_value, dec("13031.41"));
    assert_eq!(summary.total_value, dec("198071.91"));
    assert_eq!(summary.categories["Equity"], dec("184020"));
    assert_eq!(summary.categories["Bonds"], dec("1020.50"));
}

#[test]
fn registrar_statement_has_only_folios() {
    let statement = text_parser().parse(&fixture("cams.txt"), None).unwrap();

    assert_eq!(statement.meta().cas_type, FormatType::Cams);
    assert!(statement.accounts().is_empty());
    assert!(statement.holdings().is_empty());
    assert_eq!(statement.mutual_funds().len(), 2);

    let summary = statement.summary();
    assert_eq!(summary.funds_count, 3);
    assert_eq!(summary.holdings_value, Decimal::ZERO);
    assert_eq!(summary.total_value, dec("99631.08"));
    assert!(summary.categories.is_empty());
}

#[test]
fn every_holding_belongs_to_one_account() {
    for name in ["cdsl.txt", "nsdl.txt"] {
        let statement = text_parser().parse(&fixture(name), None).unwrap();
        for holding in statement.holdings() {
            let owners = statement
                .accounts()
                .iter()
                .filter(|a| a.holding_ids.contains(&holding.id))
                .count();
            assert_eq!(owners, 1, "{name}: {}", holding.id);
        }
    }
}

#[test]
fn reparsing_is_idempotent() {
    let parser = text_parser();
    let bytes = fixture("nsdl.txt");
    let first = parser.parse(&bytes, None).unwrap();
    let second = parser.parse(&bytes, None).unwrap();

    assert!(first.same_content(&second));
    assert_ne!(first.meta().tracking_id, second.meta().tracking_id);

    let strip = |s: &cas_parser::ParsedStatement| {
        let mut v = serde_json::to_value(s).unwrap();
        let meta = v["meta"].as_object_mut().unwrap();
        meta.remove("trackingId");
        meta.remove("parsedAt");
        serde_json::to_string(&v).unwrap()
    };
    assert_eq!(strip(&first), strip(&second));
}

#[test]
fn unrelated_text_is_unsupported() {
    let bytes = fixture("unrelated.txt");
    assert_eq!(
        detect(std::str::from_utf8(&bytes).unwrap()),
        FormatType::Unknown
    );

    let failure = text_parser().parse(&bytes, None).unwrap_err();
    assert_eq!(failure.kind, ErrorKind::UnsupportedFormat);
    assert!(!failure.tracking_id.is_empty());
}

#[test]
fn detection_ignores_surrounding_noise() {
    let cdsl = String::from_utf8(fixture("cdsl.txt")).unwrap();
    let noisy = format!(
        "Forwarded message\nRegistrar: KFINTECH folio services\n{cdsl}\nNSDL helpline 1800\n"
    );
    assert_eq!(detect(&noisy), FormatType::Cdsl);
}

#[test]
fn malformed_holding_value_becomes_zero() {
    let text = "\
CDSL CONSOLIDATED ACCOUNT STATEMENT
Name: ASHA RAO
DP ID: 12345678 CLIENT ID: 87654321
INE009A01021 INFOSYS LIMITED 5 N/A
INE002A01018 RELIANCE INDUSTRIES LTD 40 ₹1,15,456.40
INE467B01029 TATA CONSULTANCY SERVICES N/A
";
    let statement = text_parser().parse(text.as_bytes(), None).unwrap();
    assert_eq!(statement.holdings().len(), 3);
    assert_eq!(statement.holdings()[0].current_value, Decimal::ZERO);
    assert_eq!(statement.holdings()[1].current_value, dec("115456.40"));
    assert_eq!(statement.holdings()[2].name, "TATA CONSULTANCY SERVICES");
    assert_eq!(statement.holdings()[2].current_value, Decimal::ZERO);
    assert_eq!(statement.summary().total_value, dec("115456.40"));
}

#[test]
fn overflowing_amounts_fail_with_one_terminal_event() {
    let text = "\
CDSL CONSOLIDATED ACCOUNT STATEMENT
Name: ASHA RAO
DP ID: 12345678 CLIENT ID: 87654321
INE002A01018 RELIANCE INDUSTRIES LTD 1 79228162514264337593543950335
INE009A01021 INFOSYS LIMITED 1 79228162514264337593543950335
";
    let recorder = Arc::new(Recorder::default());
    let parser = CasParser::with_extractor(Box::new(PlainTextExtractor::new()), recorder.clone());

    let failure = parser.parse(text.as_bytes(), None).unwrap_err();
    assert_eq!(failure.kind, ErrorKind::InternalExtractionError);

    let events = recorder.events.lock().unwrap();
    let names: Vec<&str> = events.iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["started", "detected", "failed"]);
}

#[test]
fn missing_investor_is_incomplete() {
    let text = "CDSL\nDP ID: 12345678 CLIENT ID: 87654321\nINE002A01018 RELIANCE 1 100.00\n";
    let failure = text_parser().parse(text.as_bytes(), None).unwrap_err();
    assert_eq!(failure.kind, ErrorKind::ExtractionIncomplete);
}

#[test]
fn pdf_parser_rejects_garbage() {
    let failure = CasParser::default()
        .parse(b"definitely not a pdf", None)
        .unwrap_err();
    assert_eq!(failure.kind, ErrorKind::UnreadableDocument);

    let failure = CasParser::default()
        .parse(b"%PDF-1.4\ntruncated", Some("secret"))
        .unwrap_err();
    assert_eq!(failure.kind, ErrorKind::UnreadableDocument);
}

/// One-page PDF locked with AES-128 and the user password `secret`.
fn aes_locked_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::string_literal("0123456789abcdef"),
            Object::string_literal("fedcba9876543210"),
        ]),
    );
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let content = b"BT\n/F1 12 Tf\n72 720 Td\n(CDSL CONSOLIDATED ACCOUNT STATEMENT) Tj\nET\n";
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => Object::Reference(font_id) } },
        "Contents" => Object::Reference(content_id),
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let filter: Arc<dyn CryptFilter> = Arc::new(Aes128CryptFilter);
    let state = EncryptionState::try_from(EncryptionVersion::V4 {
        document: &doc,
        encrypt_metadata: true,
        crypt_filters: std::collections::BTreeMap::from([(b"StdCF".to_vec(), filter)]),
        stream_filter: b"StdCF".to_vec(),
        string_filter: b"StdCF".to_vec(),
        owner_password: "owner",
        user_password: "secret",
        permissions: Permissions::all(),
    })
    .unwrap();
    doc.encrypt(&state).unwrap();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[test]
fn encrypted_pdf_password_outcomes() {
    let bytes = aes_locked_pdf();
    let recorder = Arc::new(Recorder::default());
    let parser = CasParser::new(recorder.clone());

    let missing = parser.parse(&bytes, None).unwrap_err();
    assert_eq!(missing.kind, ErrorKind::PasswordRequired);

    let wrong = parser.parse(&bytes, Some("guess")).unwrap_err();
    assert_eq!(wrong.kind, ErrorKind::IncorrectPassword);

    if let Err(failure) = parser.parse(&bytes, Some("secret")) {
        assert_ne!(failure.kind, ErrorKind::PasswordRequired);
        assert_ne!(failure.kind, ErrorKind::IncorrectPassword);
    }

    let events = recorder.events.lock().unwrap();
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 3);
    assert_eq!(events[1].fields["kind"], "PASSWORD_REQUIRED");
}

#[test]
fn events_bracket_each_call() {
    let recorder = Arc::new(Recorder::default());
    let parser = CasParser::with_extractor(Box::new(PlainTextExtractor::new()), recorder.clone());

    parser.parse(&fixture("cams.txt"), None).unwrap();
    parser.parse(&fixture("unrelated.txt"), None).unwrap_err();

    let events = recorder.events.lock().unwrap();
    let names: Vec<&str> = events.iter().map(|e| e.name).collect();
    assert_eq!(
        names,
        vec!["started", "detected", "succeeded", "started", "detected", "failed"]
    );
    assert_eq!(events[2].fields["fundsCount"], 3);
    assert_eq!(events[5].fields["kind"], "UNSUPPORTED_FORMAT");
}

#[test]
fn cancellation_between_stages() {
    let token = CancellationToken::new();
    token.cancel();
    let failure = text_parser()
        .parse_with_cancel(&fixture("cdsl.txt"), None, &token)
        .unwrap_err();
    assert_eq!(failure.kind, ErrorKind::Cancelled);
}

#[test]
fn concurrent_parses_are_independent() {
    let parser = Arc::new(text_parser());
    let handles: Vec<_> = ["cdsl.txt", "nsdl.txt", "cams.txt", "cdsl.txt"]
        .into_iter()
        .map(|name| {
            let parser = Arc::clone(&parser);
            let bytes = fixture(name);
            std::thread::spawn(move || parser.parse(&bytes, None).unwrap())
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results[0].meta().cas_type, FormatType::Cdsl);
    assert_eq!(results[2].meta().cas_type, FormatType::Cams);
    assert!(results[0].same_content(&results[3]));
}
