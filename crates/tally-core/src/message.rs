// CANONICAL MESSAGES
// The exact byte strings signed for every protocol object
//
// SAFETY INVARIANTS:
// 1. Output order in a message is ascending by address, independent of the
//    order outputs are stored or transmitted in
// 2. Amounts always appear with exactly 8 fractional digits
// 3. Fields are concatenated with no separators except where listed; any
//    change here is a protocol fork

use crate::amount::Amount;

/// Reason string used when a penalization cites no push at all.
pub const NO_PUSH_REASON: &str = "No Push";

/// Outputs sorted by address as `address,amount`, joined by `;`, with the
/// timestamp as the final element.
pub fn output_message<'a, I>(outputs: I, timestamp: &str) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Amount)>,
{
    let mut sorted: Vec<(&str, &Amount)> = outputs.into_iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut parts: Vec<String> = sorted
        .into_iter()
        .map(|(address, amount)| format!("{},{}", address, amount.to_signed_string()))
        .collect();
    parts.push(timestamp.to_string());
    parts.join(";")
}

/// Message signed by the owner of one transaction input.
pub fn input_message(address: &str, amount: &Amount, output_message: &str) -> String {
    format!("{}{}{}", address, amount.to_signed_string(), output_message)
}

/// Body of an epoch hash push.
pub fn push_message(from_domain: &str, to_domain: &str, hashes: &[String], epoch: u64) -> String {
    format!("{}{}{}{}", from_domain, to_domain, hashes.concat(), epoch)
}

/// Reason naming a cited push: its body followed by its signature.
pub fn push_reason(
    from_domain: &str,
    to_domain: &str,
    hashes: &[String],
    epoch: u64,
    signature: &str,
) -> String {
    format!("{}{}", push_message(from_domain, to_domain, hashes, epoch), signature)
}

pub fn penalization_message(real_hash: &str, reason: &str) -> String {
    format!("{}{}", real_hash, reason)
}

pub fn registration_message(domain: &str, address: &str, timestamp: &str) -> String {
    format!("{}{}{}", domain, address, timestamp)
}

/// Signed by a node authorizing or rejecting a transaction.
pub fn attestation_message(txid: &str, domain: &str) -> String {
    format!("{}{}", txid, domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_output_message_sorted_and_fixed() {
        let a = amt("2.2");
        let b = amt("1.4");
        let outputs = vec![
            ("18pPTxvTc9rJZfD2tM1bNYHFhAcZjgqEdQ", &b),
            ("16ViwyAVeKtz4vbTXWRSYgadT5w3Rj3yuq", &a),
        ];
        assert_eq!(
            output_message(outputs, "2019-02-28T18:30:04.458796"),
            "16ViwyAVeKtz4vbTXWRSYgadT5w3Rj3yuq,2.20000000;\
             18pPTxvTc9rJZfD2tM1bNYHFhAcZjgqEdQ,1.40000000;\
             2019-02-28T18:30:04.458796"
        );
    }

    #[test]
    fn test_output_message_order_independent() {
        let a = amt("2.2");
        let b = amt("1.4");
        let forward = output_message(vec![("1A", &a), ("1B", &b)], "t");
        let backward = output_message(vec![("1B", &b), ("1A", &a)], "t");
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_empty_outputs_still_carry_timestamp() {
        assert_eq!(output_message(Vec::new(), "t"), "t");
    }

    #[test]
    fn test_input_message() {
        assert_eq!(
            input_message("18pvh", &amt("3.2"), "OUT"),
            "18pvh3.20000000OUT"
        );
    }

    #[test]
    fn test_push_and_penalization_messages() {
        let hashes = vec!["aaaa1111".to_string(), "bbbb2222".to_string()];
        assert_eq!(
            push_message("a.com", "b.com", &hashes, 7),
            "a.comb.comaaaa1111bbbb22227"
        );
        assert_eq!(
            push_reason("a.com", "b.com", &hashes, 7, "SIG"),
            "a.comb.comaaaa1111bbbb22227SIG"
        );
        assert_eq!(penalization_message("real", NO_PUSH_REASON), "realNo Push");
    }

    #[test]
    fn test_registration_and_attestation_messages() {
        assert_eq!(
            registration_message("example.com", "18pvh", "2019-02-27T13:57:32.959377"),
            "example.com18pvh2019-02-27T13:57:32.959377"
        );
        assert_eq!(attestation_message("abcd", "example.com"), "abcdexample.com");
    }
}
