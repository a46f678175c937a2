use ledger::{Ledger, LedgerConfig, LedgerError, ManualClock};
use oracle::MockOracle;
use primitives::{
    derive_category_key, Cleartext, LedgerEvent, RecordId, RecordPlaintext, RequestId, RevealView,
};
use rand::{rngs::StdRng, SeedableRng};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn new_ledger(first_request: u64) -> Ledger<MockOracle, ManualClock> {
    let mut rng = StdRng::seed_from_u64(42);
    let oracle = MockOracle::new(&mut rng).with_first_request_id(first_request);
    Ledger::new(LedgerConfig::default(), oracle, ManualClock::new(1_700_000_000)).unwrap()
}

fn submit(l: &mut Ledger<MockOracle, ManualClock>, score: &str, comment: &str) -> RecordId {
    let a = l.oracle_mut().encrypt_text(score);
    let b = l.oracle_mut().encrypt_text(comment);
    l.submit(a, b).unwrap()
}

#[test]
fn submit_request_reveal_and_replay() {
    init_tracing();
    let mut l = new_ledger(7);

    let id = submit(&mut l, "Environment", "Great");
    assert_eq!(id, RecordId(1));
    let req = l.request_reveal(id).unwrap();
    assert_eq!(req, RequestId(7));

    let (values, proof) = l.oracle().fulfill(req).unwrap();
    let plain = RecordPlaintext::from_cleartexts(&values).unwrap();
    l.handle_record_callback(req, plain.clone(), &proof).unwrap();
    assert_eq!(
        l.get_revealed(id).unwrap(),
        RevealView { score: "Environment".into(), comment: "Great".into(), is_revealed: true }
    );

    assert_eq!(l.handle_record_callback(req, plain, &proof), Err(LedgerError::AlreadyRevealed(id)));
    assert_eq!(l.get_revealed(id).unwrap().comment, "Great");

    let events = l.drain_events();
    assert_eq!(
        events,
        vec![
            LedgerEvent::Submitted { record_id: id, timestamp: 1_700_000_000 },
            LedgerEvent::RevealRequested { record_id: id, request_id: req },
            LedgerEvent::Revealed { record_id: id, request_id: req },
        ]
    );
}

#[test]
fn count_reveal_before_any_reveal_fails() {
    let mut l = new_ledger(1);
    submit(&mut l, "Environment", "Great");
    assert_eq!(
        l.request_category_count_reveal("Environment"),
        Err(LedgerError::CategoryNotFound("Environment".into()))
    );
}

#[test]
fn callbacks_may_arrive_out_of_order() {
    init_tracing();
    let mut l = new_ledger(100);
    let ids: Vec<_> = ["Environment", "Transit", "Environment", "Housing"]
        .iter()
        .map(|s| submit(&mut l, s, "comment"))
        .collect();
    let reqs: Vec<_> = ids.iter().map(|id| l.request_reveal(*id).unwrap()).collect();

    for req in reqs.iter().rev() {
        let (values, proof) = l.oracle().fulfill(*req).unwrap();
        l.handle_callback(*req, &values, &proof).unwrap();
    }
    assert!(ids.iter().all(|id| l.get_revealed(*id).unwrap().is_revealed));
    assert_eq!(l.categories(), &["Housing", "Environment", "Transit"].map(String::from));

    let req = l.request_category_count_reveal("Environment").unwrap();
    let (values, proof) = l.oracle().fulfill(req).unwrap();
    assert_eq!(values, vec![Cleartext::U64(2)]);
    l.handle_count_callback(req, 2, &proof).unwrap();
    assert_eq!(l.last_revealed_count("Environment"), Some(2));
    assert!(l.events().contains(&LedgerEvent::CountRevealRequested {
        category_hash: derive_category_key("Environment"),
        request_id: req,
    }));
}

#[test]
fn replicas_agree_on_state_digest() {
    let run = || {
        let mut l = new_ledger(1);
        for (score, comment) in [("A", "x"), ("B", "y"), ("A", "z")] {
            let id = submit(&mut l, score, comment);
            let req = l.request_reveal(id).unwrap();
            let (values, proof) = l.oracle().fulfill(req).unwrap();
            l.handle_callback(req, &values, &proof).unwrap();
        }
        l.state_digest()
    };
    assert_eq!(run(), run());
}

#[test]
fn foreign_oracle_proofs_are_refused() {
    let mut l = new_ledger(1);
    let id = submit(&mut l, "Environment", "Great");
    let req = l.request_reveal(id).unwrap();

    let rogue = MockOracle::with_key([1u8; 32]);
    let handles = l.pending_request(req).unwrap().handles.clone();
    let fake = RecordPlaintext::new("Fake", "Bad");
    let encoded = primitives::encode_cleartexts(&fake.to_cleartexts());
    let proof = rogue.sign(req, &handles, &encoded);

    let before = l.state_digest();
    assert_eq!(
        l.handle_record_callback(req, RecordPlaintext::new("Fake", "Bad"), &proof),
        Err(LedgerError::ProofInvalid(req))
    );
    assert_eq!(l.state_digest(), before);
}
