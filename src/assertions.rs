//! Semantic assertions over registry responses
//!
//! Pure checks against a navigated message or segment; each returns
//! normally or fails with an `Assertion` error carrying the expected
//! and actual values. Navigation misses inside an assertion propagate
//! as-is unless the assertion deliberately probes for absence.

use crate::common::{Error, Result};
use crate::hl7::{navigate, DomainTable, Message, Segment};

/// MSA-1 codes meaning the transaction was accepted
const ACCEPT_CODES: &[&str] = &["AA", "CA"];
/// MSA-1 codes meaning the transaction was rejected or errored
const REJECT_CODES: &[&str] = &["AE", "AR", "CE", "CR"];

fn ack_code(message: &Message) -> Result<String> {
    Ok(navigate(message, "/MSA")?.value(1).to_string())
}

/// The transaction was accepted (MSA-1 is AA or CA)
///
/// An unrecognized code is its own failure, distinct from rejection.
pub fn assert_accepted(message: &Message) -> Result<()> {
    let code = ack_code(message)?;
    if ACCEPT_CODES.contains(&code.as_str()) {
        return Ok(());
    }
    if REJECT_CODES.contains(&code.as_str()) {
        return Err(Error::assertion(
            "acknowledgment code",
            "acceptance (AA/CA)",
            format!("rejection ({code})"),
        ));
    }
    Err(Error::assertion(
        "acknowledgment code",
        "acceptance (AA/CA)",
        format!("unrecognized code '{code}'"),
    ))
}

/// The transaction was rejected (MSA-1 is AE, AR, CE, or CR)
pub fn assert_rejected(message: &Message) -> Result<()> {
    let code = ack_code(message)?;
    if REJECT_CODES.contains(&code.as_str()) {
        return Ok(());
    }
    if ACCEPT_CODES.contains(&code.as_str()) {
        return Err(Error::assertion(
            "acknowledgment code",
            "rejection (AE/AR/CE/CR)",
            format!("acceptance ({code})"),
        ));
    }
    Err(Error::assertion(
        "acknowledgment code",
        "rejection (AE/AR/CE/CR)",
        format!("unrecognized code '{code}'"),
    ))
}

/// Exact match on message type, trigger event, structure id, and version
///
/// Pass `None` for the structure when the protocol version carries no
/// distinct structure identifier (2.3.1 ACKs); the component is then
/// not checked.
pub fn assert_message_type_version(
    message: &Message,
    message_type: &str,
    trigger_event: &str,
    structure: Option<&str>,
    version: &str,
) -> Result<()> {
    if message.message_type() != message_type {
        return Err(Error::assertion(
            "message type",
            message_type,
            message.message_type(),
        ));
    }
    if message.trigger_event() != trigger_event {
        return Err(Error::assertion(
            "trigger event",
            trigger_event,
            message.trigger_event(),
        ));
    }
    if let Some(expected) = structure {
        if message.structure() != Some(expected) {
            return Err(Error::assertion(
                "message structure",
                expected,
                message.structure().unwrap_or("(none)"),
            ));
        }
    }
    if message.version() != version {
        return Err(Error::assertion("version", version, message.version()));
    }
    Ok(())
}

/// The response is routed back to the expected application/facility
/// (MSH-5 and MSH-6 of the response header)
pub fn assert_receiving_facility(
    message: &Message,
    application: &str,
    facility: &str,
) -> Result<()> {
    let msh = navigate(message, "/MSH")?;
    let actual_app = msh.value(5);
    let actual_fac = msh.value(6);
    if actual_app != application {
        return Err(Error::assertion(
            "receiving application (MSH-5)",
            application,
            if actual_app.is_empty() { "(empty)" } else { actual_app },
        ));
    }
    if actual_fac != facility {
        return Err(Error::assertion(
            "receiving facility (MSH-6)",
            facility,
            if actual_fac.is_empty() { "(empty)" } else { actual_fac },
        ));
    }
    Ok(())
}

/// At least one error-detail (ERR) segment is present anywhere
pub fn assert_has_err(message: &Message) -> Result<()> {
    if message.segments().iter().any(|s| s.name() == "ERR") {
        return Ok(());
    }
    Err(Error::assertion(
        "error detail",
        "at least one ERR segment",
        "none",
    ))
}

/// Exactly one repetition of the query-result group exists
///
/// Verified structurally: index 0 must resolve and index 1 must fail
/// with `PathNotFound`. Any other navigation error propagates.
pub fn assert_has_one_query_result(message: &Message) -> Result<()> {
    match navigate(message, "/QUERY_RESPONSE(0)/PID") {
        Ok(_) => {}
        Err(e) if e.is_path_not_found() => {
            return Err(Error::assertion("query results", "exactly one", "none"));
        }
        Err(e) => return Err(e),
    }
    match navigate(message, "/QUERY_RESPONSE(1)/PID") {
        Err(e) if e.is_path_not_found() => Ok(()),
        Err(e) => Err(e),
        Ok(_) => Err(Error::assertion(
            "query results",
            "exactly one",
            "more than one",
        )),
    }
}

/// The identifier list (PID-3) of a segment contains an identifier with
/// the given value whose assigning authority resolves to the same
/// domain as (namespace, universal_id)
///
/// Either half of an authority designator suffices on either side;
/// both are normalized through the domain table before comparison, so
/// a value match under a different authority never passes.
pub fn assert_pid3_containing(
    segment: &Segment,
    id: &str,
    namespace: &str,
    universal_id: &str,
    domains: &DomainTable,
) -> Result<()> {
    let expected_key = domains.key(namespace, universal_id).ok_or_else(|| {
        Error::Assertion(format!(
            "expected domain has neither namespace nor universal id (id '{id}')"
        ))
    })?;

    let mut found = Vec::new();
    if let Some(field) = segment.field(3) {
        for rep in field.repetitions() {
            let value = rep.component_value(1);
            let (ns, oid) = rep
                .component(4)
                .map(|c| (c.subcomponent(1), c.subcomponent(2)))
                .unwrap_or(("", ""));

            if value == id && domains.key(ns, oid).as_deref() == Some(expected_key.as_str()) {
                return Ok(());
            }
            if !value.is_empty() {
                found.push(format!("{value}^^^{ns}&{oid}"));
            }
        }
    }

    Err(Error::assertion(
        "identifier list (PID-3)",
        format!("'{id}' in domain {namespace}/{universal_id}"),
        format!("[{}]", found.join(", ")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hl7::domain::{TEST_A_DOMAIN_OID, TEST_DOMAIN_OID};

    fn ack(code: &str) -> Message {
        Message::parse(&format!(
            "MSH|^~\\&|CR1|MOH_CAAT|TEST_HARNESS|TEST|20260101120000||ACK^A01|42|P|2.3.1\rMSA|{code}|42\r"
        ))
        .unwrap()
    }

    fn ack_with_err() -> Message {
        Message::parse(
            "MSH|^~\\&|CR1|MOH_CAAT|TEST_HARNESS|TEST|20260101120000||ACK^A01|42|P|2.3.1\rMSA|AE|42\rERR|^^^207&Application internal error\r",
        )
        .unwrap()
    }

    fn rsp(pids: &[&str]) -> Message {
        let mut text = String::from(
            "MSH|^~\\&|CR1|MOH_CAAT|TEST_HARNESS|TEST|20260101120000||RSP^K23^RSP_K23|43|P|2.5\rMSA|AA|43\rQAK|Q1|OK\r",
        );
        for pid3 in pids {
            text.push_str(&format!("PID|1||{pid3}\r"));
        }
        Message::parse(&text).unwrap()
    }

    #[test]
    fn test_accepted_and_rejected() {
        assert!(assert_accepted(&ack("AA")).is_ok());
        assert!(assert_accepted(&ack("CA")).is_ok());
        assert!(assert_accepted(&ack("AE")).is_err());
        assert!(assert_rejected(&ack("AE")).is_ok());
        assert!(assert_rejected(&ack("AR")).is_ok());
        assert!(assert_rejected(&ack("AA")).is_err());
    }

    #[test]
    fn test_unrecognized_code_fails_both_ways() {
        let msg = ack("XX");
        let accept_err = assert_accepted(&msg).unwrap_err();
        let reject_err = assert_rejected(&msg).unwrap_err();
        assert!(accept_err.to_string().contains("unrecognized"));
        assert!(reject_err.to_string().contains("unrecognized"));
    }

    #[test]
    fn test_message_type_version() {
        let msg = ack("AA");
        assert!(assert_message_type_version(&msg, "ACK", "A01", None, "2.3.1").is_ok());
        assert!(assert_message_type_version(&msg, "ACK", "A04", None, "2.3.1").is_err());
        assert!(assert_message_type_version(&msg, "ACK", "A01", None, "2.5").is_err());

        let msg = rsp(&[]);
        assert!(
            assert_message_type_version(&msg, "RSP", "Q23", Some("RSP_K23"), "2.5").is_ok()
        );
        assert!(
            assert_message_type_version(&msg, "RSP", "Q23", Some("RSP_K21"), "2.5").is_err()
        );
    }

    #[test]
    fn test_receiving_facility() {
        let msg = ack("AA");
        assert!(assert_receiving_facility(&msg, "TEST_HARNESS", "TEST").is_ok());
        assert!(assert_receiving_facility(&msg, "TEST_HARNESS_A", "TEST").is_err());
        assert!(assert_receiving_facility(&msg, "TEST_HARNESS", "PROD").is_err());
    }

    #[test]
    fn test_has_err() {
        assert!(assert_has_err(&ack_with_err()).is_ok());
        assert!(assert_has_err(&ack("AE")).is_err());
    }

    #[test]
    fn test_one_query_result() {
        let one = rsp(&["RJ-438^^^TEST&2.16.840.1.113883.3.72.5.9.1&ISO^PI"]);
        assert!(assert_has_one_query_result(&one).is_ok());

        let none = rsp(&[]);
        let err = assert_has_one_query_result(&none).unwrap_err();
        assert!(err.to_string().contains("none"));

        let two = rsp(&[
            "RJ-438^^^TEST&2.16.840.1.113883.3.72.5.9.1&ISO^PI",
            "RJ-700^^^TEST&2.16.840.1.113883.3.72.5.9.1&ISO^PI",
        ]);
        let err = assert_has_one_query_result(&two).unwrap_err();
        assert!(err.to_string().contains("more than one"));
    }

    #[test]
    fn test_pid3_containing_by_full_authority() {
        let msg = rsp(&["RJ-438^^^TEST&2.16.840.1.113883.3.72.5.9.1&ISO^PI"]);
        let pid = navigate(&msg, "/QUERY_RESPONSE(0)/PID").unwrap();
        let table = DomainTable::default();
        assert!(
            assert_pid3_containing(pid, "RJ-438", "TEST", TEST_DOMAIN_OID, &table).is_ok()
        );
    }

    #[test]
    fn test_pid3_containing_honors_partial_authority() {
        let table = DomainTable::default();

        // namespace only in the response
        let msg = rsp(&["RJ-438^^^TEST^PI"]);
        let pid = navigate(&msg, "/QUERY_RESPONSE(0)/PID").unwrap();
        assert!(
            assert_pid3_containing(pid, "RJ-438", "TEST", TEST_DOMAIN_OID, &table).is_ok()
        );

        // universal id only in the response
        let msg = rsp(&["RJ-438^^^&2.16.840.1.113883.3.72.5.9.1&ISO^PI"]);
        let pid = navigate(&msg, "/QUERY_RESPONSE(0)/PID").unwrap();
        assert!(
            assert_pid3_containing(pid, "RJ-438", "TEST", TEST_DOMAIN_OID, &table).is_ok()
        );
    }

    #[test]
    fn test_pid3_domain_isolation() {
        // same identifier value, but assigned under TEST_A
        let msg = rsp(&["RJ-438^^^TEST_A&2.16.840.1.113883.3.72.5.9.2&ISO^PI"]);
        let pid = navigate(&msg, "/QUERY_RESPONSE(0)/PID").unwrap();
        let table = DomainTable::default();
        let err = assert_pid3_containing(pid, "RJ-438", "TEST", TEST_DOMAIN_OID, &table)
            .unwrap_err();
        assert!(matches!(err, Error::Assertion(_)), "got {err:?}");
    }

    #[test]
    fn test_pid3_scans_all_repetitions() {
        let msg = rsp(&[
            "NID-77^^^NID&2.16.840.1.113883.3.72.5.9.9&ISO^PI~RJ-449^^^TEST_A&2.16.840.1.113883.3.72.5.9.2&ISO^PI",
        ]);
        let pid = navigate(&msg, "/QUERY_RESPONSE(0)/PID").unwrap();
        let table = DomainTable::default();
        assert!(
            assert_pid3_containing(pid, "RJ-449", "TEST_A", TEST_A_DOMAIN_OID, &table).is_ok()
        );
    }

    #[test]
    fn test_pid3_value_missing() {
        let msg = rsp(&["RJ-438^^^TEST&2.16.840.1.113883.3.72.5.9.1&ISO^PI"]);
        let pid = navigate(&msg, "/QUERY_RESPONSE(0)/PID").unwrap();
        let table = DomainTable::default();
        let err = assert_pid3_containing(pid, "RJ-999", "TEST", TEST_DOMAIN_OID, &table)
            .unwrap_err();
        assert!(err.to_string().contains("RJ-438"));
    }
}
