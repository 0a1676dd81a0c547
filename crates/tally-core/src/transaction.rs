// TRANSACTIONS
// Data model, txid, creation and the full validation pipeline
//
// SAFETY INVARIANTS:
// 1. Every input signature covers the canonical (address-sorted) view of the
//    outputs, so the stored output order carries no meaning
// 2. The txid covers timestamp, outputs and input addresses/amounts, never
//    signatures, and is independent of output and input order
// 3. Validation is all-or-nothing and reads nothing but the ledger oracle
// 4. An address may not be spent from again within one propagation window of
//    its previous spend

use crate::amount::Amount;
use crate::clock::{format_timestamp, parse_timestamp, EpochClock};
use crate::config::NetworkConfig;
use crate::error::ValidationError;
use crate::ledger::LedgerOracle;
use crate::message::{input_message, output_message};
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tally_crypto::{sha256_hex, validate_p2pkh, verify_signed_by, PrivateKey};

/// A signed spend from one address. Travels as `[address, amount, signature]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, Amount, String)", into = "(String, Amount, String)")]
pub struct TxInput {
    pub address: String,
    pub amount: Amount,
    pub signature: String,
}

impl From<(String, Amount, String)> for TxInput {
    fn from((address, amount, signature): (String, Amount, String)) -> Self {
        TxInput { address, amount, signature }
    }
}

impl From<TxInput> for (String, Amount, String) {
    fn from(input: TxInput) -> Self {
        (input.address, input.amount, input.signature)
    }
}

/// A payment to one address. Travels as `[address, amount]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, Amount)", into = "(String, Amount)")]
pub struct TxOutput {
    pub address: String,
    pub amount: Amount,
}

impl TxOutput {
    pub fn new(address: &str, amount: Amount) -> Self {
        TxOutput { address: address.to_string(), amount }
    }
}

impl From<(String, Amount)> for TxOutput {
    fn from((address, amount): (String, Amount)) -> Self {
        TxOutput { address, amount }
    }
}

impl From<TxOutput> for (String, Amount) {
    fn from(output: TxOutput) -> Self {
        (output.address, output.amount)
    }
}

/// An input before signing: the spending address, the amount, and the key
/// that owns the address.
#[derive(Debug, Clone)]
pub struct SigningInput {
    pub address: String,
    pub amount: Amount,
    pub key: PrivateKey,
}

impl SigningInput {
    pub fn new(address: &str, amount: Amount, key: PrivateKey) -> Self {
        SigningInput { address: address.to_string(), amount, key }
    }

    /// Input spending from the key's own address.
    pub fn from_key(key: PrivateKey, amount: Amount) -> Self {
        SigningInput { address: key.address(), amount, key }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub timestamp: String,
}

impl Transaction {
    pub fn txid(&self) -> String {
        make_txid(self)
    }

    pub fn total_input(&self) -> Amount {
        self.inputs.iter().map(|i| &i.amount).sum()
    }

    pub fn total_output(&self) -> Amount {
        self.outputs.iter().map(|o| &o.amount).sum()
    }
}

/// Validate outputs and build their canonical message.
///
/// Returns the output total together with the message every input signs.
fn process_outputs(
    outputs: &[TxOutput],
    timestamp: &str,
    decimals: u32,
) -> Result<(Amount, String), ValidationError> {
    for output in outputs {
        output.amount.check_well_formed(decimals, "Output")?;
        validate_p2pkh(&output.address).map_err(|e| {
            ValidationError::InvalidAddress(format!("Invalid address: {}", e))
        })?;
    }

    let total = outputs.iter().map(|o| &o.amount).sum();
    let message = output_message(
        outputs.iter().map(|o| (o.address.as_str(), &o.amount)),
        timestamp,
    );
    Ok((total, message))
}

/// Build and sign a transaction timestamped now.
pub fn make_transaction(
    inputs: &[SigningInput],
    outputs: Vec<TxOutput>,
    config: &NetworkConfig,
) -> Result<Transaction, ValidationError> {
    make_transaction_at(inputs, outputs, Utc::now(), config)
}

/// Build and sign a transaction with an explicit timestamp.
///
/// Outputs are returned in random order; signatures do not depend on it.
pub fn make_transaction_at(
    inputs: &[SigningInput],
    mut outputs: Vec<TxOutput>,
    timestamp: DateTime<Utc>,
    config: &NetworkConfig,
) -> Result<Transaction, ValidationError> {
    let timestamp = format_timestamp(timestamp);
    let (out_total, out_msg) = process_outputs(&outputs, &timestamp, config.decimals)?;

    let mut signed = Vec::with_capacity(inputs.len());
    for input in inputs {
        input.amount.check_well_formed(config.decimals, "Input")?;
        let message = input_message(&input.address, &input.amount, &out_msg);
        signed.push(TxInput {
            address: input.address.clone(),
            amount: input.amount.clone(),
            signature: input.key.sign(message.as_bytes()),
        });
    }

    let in_total: Amount = signed.iter().map(|i| &i.amount).sum();
    if in_total < out_total {
        return Err(ValidationError::InvalidAmounts(format!(
            "Not enough inputs for outputs: {} in, {} out",
            in_total, out_total
        )));
    }

    outputs.shuffle(&mut rand::thread_rng());

    Ok(Transaction {
        inputs: signed,
        outputs,
        timestamp,
    })
}

/// Full validation of a received transaction.
///
/// `ledger` is optional: without it only the cryptographic and arithmetic
/// rules are checked.
pub fn validate_transaction(
    tx: &Transaction,
    ledger: Option<&dyn LedgerOracle>,
    now: DateTime<Utc>,
    config: &NetworkConfig,
) -> Result<(), ValidationError> {
    let result = check_transaction(tx, ledger, now, config);
    match &result {
        Ok(()) => debug!("Transaction {} accepted", make_txid(tx)),
        Err(e) => warn!("Transaction {} rejected: {}", make_txid(tx), e),
    }
    result
}

fn check_transaction(
    tx: &Transaction,
    ledger: Option<&dyn LedgerOracle>,
    now: DateTime<Utc>,
    config: &NetworkConfig,
) -> Result<(), ValidationError> {
    let ts = parse_timestamp(&tx.timestamp)?;
    let (out_total, out_msg) = process_outputs(&tx.outputs, &tx.timestamp, config.decimals)?;
    EpochClock::new(config).validate_timestamp(ts, now)?;

    let spacing = Duration::seconds(config.propagation_window_seconds as i64);
    let mut in_total = Amount::zero();

    for (i, input) in tx.inputs.iter().enumerate() {
        input
            .amount
            .check_well_formed(config.decimals, &format!("Input {}", i))?;
        in_total = &in_total + &input.amount;

        let message = input_message(&input.address, &input.amount, &out_msg);
        verify_signed_by(message.as_bytes(), &input.signature, &input.address).map_err(|e| {
            ValidationError::InvalidSignature(format!("Signature {} not valid: {}", i, e))
        })?;

        if let Some(ledger) = ledger {
            let (balance, last_spend) = ledger
                .balance_and_last_spend(&input.address)
                .unwrap_or((Amount::zero(), DateTime::<Utc>::MIN_UTC));
            if balance < input.amount {
                return Err(ValidationError::InvalidAmounts(format!(
                    "Not enough balance in {}",
                    input.address
                )));
            }
            let too_young = last_spend
                .checked_add_signed(spacing)
                .map_or(true, |settled_at| settled_at > ts);
            if too_young {
                return Err(ValidationError::InvalidTransaction(format!(
                    "Input too young: {} last spent at {}",
                    input.address,
                    format_timestamp(last_spend)
                )));
            }
        }
    }

    if in_total < out_total {
        return Err(ValidationError::InvalidAmounts(
            "Input amount does not exceed output amount".to_string(),
        ));
    }

    let fee = &in_total - &out_total;
    if fee < config.min_fee {
        return Err(ValidationError::InvalidFee(format!(
            "Fee of {} below min fee of {}",
            fee, config.min_fee
        )));
    }

    Ok(())
}

fn sorted_entries<'a, I>(entries: I) -> Vec<(&'a str, String)>
where
    I: IntoIterator<Item = (&'a str, &'a Amount)>,
{
    let mut sorted: Vec<(&str, String)> = entries
        .into_iter()
        .map(|(address, amount)| (address, amount.to_signed_string()))
        .collect();
    sorted.sort();
    sorted
}

/// Transaction id: SHA-256 of the timestamp, then each output and each input
/// as address + 8-digit amount, each group sorted by address.
pub fn make_txid(tx: &Transaction) -> String {
    let outputs = sorted_entries(tx.outputs.iter().map(|o| (o.address.as_str(), &o.amount)));
    let inputs = sorted_entries(tx.inputs.iter().map(|i| (i.address.as_str(), &i.amount)));

    let mut msg = tx.timestamp.clone();
    for (address, amount) in outputs.iter().chain(inputs.iter()) {
        msg.push_str(address);
        msg.push_str(amount);
    }
    sha256_hex(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ledger::MemoryLedger;

    const WIF_A: &str = "KwuVvv359oft9TfzyYLAQBgpPyCFpcTSrV9ZgJF9jKdT8jd7XLH2";
    const ADDR_A: &str = "18pvhMkv1MZbZZEncKucAmVDLXZsD9Dhk6";
    const WIF_B: &str = "KxWoW9Pj45UzUH1d5p3wPe7zxbdJqU7HHkDQF1YQS1AiQg9qeZ9H";
    const ADDR_B: &str = "14ZiHtrmT6Mi4RT2Liz51WKZMeyq2n5tgG";
    const OUT_1: &str = "16ViwyAVeKtz4vbTXWRSYgadT5w3Rj3yuq";
    const OUT_2: &str = "18pPTxvTc9rJZfD2tM1bNYHFhAcZjgqEdQ";

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    fn ts(raw: &str) -> DateTime<Utc> {
        parse_timestamp(raw).unwrap()
    }

    fn inputs() -> Vec<SigningInput> {
        vec![
            SigningInput::new(ADDR_A, amt("3.2"), PrivateKey::from_wif(WIF_A).unwrap()),
            SigningInput::new(ADDR_B, amt("0.5"), PrivateKey::from_wif(WIF_B).unwrap()),
        ]
    }

    fn outputs() -> Vec<TxOutput> {
        vec![TxOutput::new(OUT_1, amt("2.2")), TxOutput::new(OUT_2, amt("1.4"))]
    }

    fn created_at() -> DateTime<Utc> {
        ts("2019-02-28T18:30:04.458796")
    }

    fn received_at() -> DateTime<Utc> {
        ts("2019-02-28T18:30:06.458796")
    }

    fn ledger() -> MemoryLedger {
        let old = ts("2019-01-01T00:00:00");
        MemoryLedger::new()
            .with_account(ADDR_A, amt("3.2"), old)
            .with_account(ADDR_B, amt("0.5"), old)
    }

    fn signed() -> Transaction {
        make_transaction_at(&inputs(), outputs(), created_at(), &NetworkConfig::default()).unwrap()
    }

    fn check(tx: &Transaction, ledger: Option<&dyn LedgerOracle>) -> Result<(), ValidationError> {
        validate_transaction(tx, ledger, received_at(), &NetworkConfig::default())
    }

    #[test]
    fn test_basic_transaction_validates() {
        let tx = signed();
        assert_eq!(tx.timestamp, "2019-02-28T18:30:04.458796");
        assert!(check(&tx, Some(&ledger())).is_ok());
        assert!(check(&tx, None).is_ok());
    }

    #[test]
    fn test_insufficient_balance() {
        let old = ts("2019-01-01T00:00:00");
        let bad = MemoryLedger::new()
            .with_account(ADDR_A, amt("1.0"), old)
            .with_account(ADDR_B, amt("0.3"), old);
        let err = check(&signed(), Some(&bad)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmounts);
    }

    #[test]
    fn test_unknown_input_address_has_no_balance() {
        let err = check(&signed(), Some(&MemoryLedger::new())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmounts);
    }

    #[test]
    fn test_edited_signature_rejected() {
        let mut tx = signed();
        tx.inputs[0].signature = "23784623kjhdfkjashdfkj837242387".to_string();
        assert_eq!(check(&tx, Some(&ledger())).unwrap_err().kind(), ErrorKind::InvalidSignature);
    }

    #[test]
    fn test_swapped_signatures_rejected() {
        let mut tx = signed();
        let first = tx.inputs[0].signature.clone();
        tx.inputs[0].signature = tx.inputs[1].signature.clone();
        tx.inputs[1].signature = first;
        assert_eq!(check(&tx, None).unwrap_err().kind(), ErrorKind::InvalidSignature);
    }

    #[test]
    fn test_changed_amount_rejected() {
        let mut tx = signed();
        tx.inputs[0].amount = amt("0.2");
        assert_eq!(check(&tx, Some(&ledger())).unwrap_err().kind(), ErrorKind::InvalidSignature);
    }

    #[test]
    fn test_changed_output_rejected() {
        let mut tx = signed();
        tx.outputs[0].amount = &tx.outputs[0].amount - &amt("0.1");
        assert_eq!(check(&tx, None).unwrap_err().kind(), ErrorKind::InvalidSignature);
    }

    #[test]
    fn test_output_order_does_not_matter() {
        let mut tx = signed();
        tx.outputs.reverse();
        assert!(check(&tx, Some(&ledger())).is_ok());
    }

    #[test]
    fn test_outputs_exceed_inputs_on_creation() {
        let bad = vec![TxOutput::new(OUT_1, amt("2.2")), TxOutput::new(OUT_2, amt("9.4"))];
        let err = make_transaction_at(&inputs(), bad, created_at(), &NetworkConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmounts);
    }

    #[test]
    fn test_zero_and_negative_outputs_on_creation() {
        for bad_amount in ["0", "-42.07"] {
            let bad = vec![TxOutput::new(OUT_1, amt(bad_amount)), TxOutput::new(OUT_2, amt("9.4"))];
            let err = make_transaction_at(&inputs(), bad, created_at(), &NetworkConfig::default())
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidAmounts);
        }
    }

    #[test]
    fn test_over_precise_amounts_rejected() {
        let config = NetworkConfig::default();
        let bad = vec![TxOutput::new(OUT_1, amt("2.000000001"))];
        let err = make_transaction_at(&inputs(), bad, created_at(), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmounts);

        let mut tx = signed();
        tx.inputs[1].amount = amt("0.500000001");
        assert_eq!(check(&tx, None).unwrap_err().kind(), ErrorKind::InvalidAmounts);
    }

    #[test]
    fn test_script_hash_output_rejected() {
        let bad = vec![TxOutput::new("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy", amt("2.2"))];
        let err = make_transaction_at(&inputs(), bad, created_at(), &NetworkConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAddress);
    }

    #[test]
    fn test_malformed_output_address_rejected_on_validation() {
        let mut tx = signed();
        tx.outputs = vec![TxOutput::new("YYY", amt("2.2")), TxOutput::new("XXX", amt("1.4"))];
        assert_eq!(check(&tx, None).unwrap_err().kind(), ErrorKind::InvalidAddress);
    }

    #[test]
    fn test_fee_below_minimum() {
        let outs = vec![TxOutput::new(OUT_1, amt("2.2")), TxOutput::new(OUT_2, amt("1.495"))];
        let tx = make_transaction_at(&inputs(), outs, created_at(), &NetworkConfig::default()).unwrap();
        assert_eq!(check(&tx, None).unwrap_err().kind(), ErrorKind::InvalidFee);
    }

    #[test]
    fn test_fee_exactly_minimum_accepted() {
        let outs = vec![TxOutput::new(OUT_1, amt("2.2")), TxOutput::new(OUT_2, amt("1.49"))];
        let tx = make_transaction_at(&inputs(), outs, created_at(), &NetworkConfig::default()).unwrap();
        assert!(check(&tx, None).is_ok());
    }

    #[test]
    fn test_input_too_young() {
        let recent = ts("2019-02-28T18:30:02.458796");
        let young = MemoryLedger::new()
            .with_account(ADDR_A, amt("3.2"), recent)
            .with_account(ADDR_B, amt("0.5"), recent);
        let err = check(&signed(), Some(&young)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransaction);

        let settled = ts("2019-02-28T18:29:54.458796");
        let old_enough = MemoryLedger::new()
            .with_account(ADDR_A, amt("3.2"), settled)
            .with_account(ADDR_B, amt("0.5"), settled);
        assert!(check(&signed(), Some(&old_enough)).is_ok());
    }

    #[test]
    fn test_timestamp_rules_applied() {
        let tx = signed();
        let late = ts("2019-02-28T18:31:00");
        let err = validate_transaction(&tx, None, late, &NetworkConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExpiredTimestamp);

        let closing = make_transaction_at(
            &inputs(),
            outputs(),
            ts("2019-02-28T18:39:55"),
            &NetworkConfig::default(),
        )
        .unwrap();
        let err = validate_transaction(&closing, None, ts("2019-02-28T18:39:56"), &NetworkConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTimestamp);
    }

    #[test]
    fn test_txid_regression() {
        let tx = Transaction {
            inputs: vec![
                TxInput { address: ADDR_A.into(), amount: amt("3.2"), signature: "sig-a".into() },
                TxInput { address: ADDR_B.into(), amount: amt("0.5"), signature: "sig-b".into() },
            ],
            outputs: vec![TxOutput::new(OUT_2, amt("1.4")), TxOutput::new(OUT_1, amt("2.2"))],
            timestamp: "2019-02-28T18:30:04.458796".into(),
        };
        assert_eq!(
            make_txid(&tx),
            "e7ed85bf81fa99f704dfdba372cd3ffdd93890c0c9afaf2c6051f8b93b79e524"
        );
    }

    #[test]
    fn test_txid_survives_relay_reordering() {
        let tx = signed();
        let mut reordered = tx.clone();
        reordered.outputs.reverse();
        reordered.inputs.reverse();

        check(&reordered, Some(&ledger())).unwrap();
        assert_eq!(tx.txid(), reordered.txid());
    }

    #[test]
    fn test_txid_ignores_signatures() {
        let tx = signed();
        let mut resigned = tx.clone();
        for input in &mut resigned.inputs {
            input.signature = "other".to_string();
        }
        assert_eq!(tx.txid(), resigned.txid());

        let mut changed = tx.clone();
        changed.inputs[0].amount = amt("3.1");
        assert_ne!(tx.txid(), changed.txid());
    }

    #[test]
    fn test_wire_format_uses_arrays() {
        let tx = signed();
        let json = serde_json::to_value(&tx).unwrap();
        assert!(json["inputs"][0].is_array());
        assert_eq!(json["inputs"][0][0], ADDR_A);
        assert_eq!(json["outputs"][0].as_array().unwrap().len(), 2);

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn test_float_amounts_from_wire() {
        let raw = format!(
            r#"{{"inputs": [["{}", 3.2, "x"]], "outputs": [["{}", 2.2]], "timestamp": "2019-02-13T19:14:27.882253"}}"#,
            ADDR_A, OUT_1
        );
        let tx: Transaction = serde_json::from_str(&raw).unwrap();
        assert_eq!(tx.inputs[0].amount, amt("3.2"));
        assert_eq!(tx.total_output(), amt("2.2"));
    }
}
