//! The built-in OHIE-CR scenario suite
//!
//! Client Registry conformance scenarios from the OpenHIE health
//! information exchange specification. Fixture identifiers follow the
//! `<SCENARIO>-<STEP>` convention and resolve against the repository
//! shipped under `fixtures/`.

use crate::hl7::domain::{TEST_A_DOMAIN_OID, TEST_DOMAIN_OID};
use crate::scenario::{Expect, Scenario, ScenarioStep};

/// Suite-wide setup: this record must be accepted before any scenario
/// runs (OHIE-CR-05 queries against it)
pub const PRECONDITION_STEP: &str = "OHIE-CR-05-10";

const TEST_HARNESS: &str = "TEST_HARNESS";
const TEST_HARNESS_A: &str = "TEST_HARNESS_A";
const TEST_HARNESS_B: &str = "TEST_HARNESS_B";
const FACILITY_UNIVERSE: &str = "TEST";

/// The PID of the first (and only expected) query match
const FIRST_RESULT_PID: &str = "/QUERY_RESPONSE(0)/PID";

/// All scenarios in suite order
pub fn scenarios() -> Vec<Scenario> {
    vec![
        cr01(),
        cr02(),
        cr03(),
        cr04(),
        cr05(),
        cr06(),
        pending(
            "OHIE-CR-07",
            "Links an infant record to its mother via the mother's identifier",
        ),
        pending(
            "OHIE-CR-08",
            "Stores and conveys a complete patient record (multiple names, addresses, telecoms, birth order)",
        ),
        pending(
            "OHIE-CR-09",
            "Returns the identifiers linked to a newly registered patient",
        ),
        pending(
            "OHIE-CR-10",
            "Cross-references the TEST domain against the registry-assigned ECID domain, honoring What-Domains-Returned",
        ),
    ]
}

/// Scenarios matching any of the given ids (all scenarios when empty)
pub fn select(ids: &[String]) -> Vec<Scenario> {
    let all = scenarios();
    if ids.is_empty() {
        return all;
    }
    all.into_iter().filter(|s| ids.contains(&s.id)).collect()
}

fn ack_a01() -> Expect {
    Expect::MessageTypeVersion {
        message_type: "ACK".to_string(),
        trigger_event: "A01".to_string(),
        structure: None,
        version: "2.3.1".to_string(),
    }
}

fn rsp_k23() -> Expect {
    Expect::MessageTypeVersion {
        message_type: "RSP".to_string(),
        trigger_event: "Q23".to_string(),
        structure: Some("RSP_K23".to_string()),
        version: "2.5".to_string(),
    }
}

fn facility(application: &str) -> Expect {
    Expect::ReceivingFacility {
        application: application.to_string(),
        facility: FACILITY_UNIVERSE.to_string(),
    }
}

fn pid3(id: &str, namespace: &str, universal_id: &str) -> Expect {
    Expect::Pid3Containing {
        path: FIRST_RESULT_PID.to_string(),
        id: id.to_string(),
        namespace: namespace.to_string(),
        universal_id: universal_id.to_string(),
    }
}

/// OHIE-CR-01: a registration whose PID-3 carries no assigning
/// authority must be rejected
fn cr01() -> Scenario {
    Scenario::new(
        "OHIE-CR-01",
        "Rejects a poorly formed message lacking assigner information in PID-3",
        vec![ScenarioStep::new(
            "OHIE-CR-01-10",
            vec![Expect::Rejected, ack_a01()],
        )],
    )
}

/// OHIE-CR-02: partial CX.4 data (namespace or OID alone) must be
/// completed by the registry and remain queryable either way
fn cr02() -> Scenario {
    Scenario::new(
        "OHIE-CR-02",
        "Populates CX.4.1 from CX.4.2/CX.4.3 or vice-versa given partial assigning authority data",
        vec![
            ScenarioStep::new(
                "OHIE-CR-02-10",
                vec![Expect::Accepted, facility(TEST_HARNESS), ack_a01()],
            ),
            ScenarioStep::new(
                "OHIE-CR-02-20",
                vec![
                    Expect::Accepted,
                    facility(TEST_HARNESS),
                    rsp_k23(),
                    Expect::OneQueryResult,
                    pid3("RJ-438", "TEST", TEST_DOMAIN_OID),
                ],
            ),
            ScenarioStep::new(
                "OHIE-CR-02-30",
                vec![Expect::Accepted, facility(TEST_HARNESS), ack_a01()],
            ),
            ScenarioStep::new(
                "OHIE-CR-02-40",
                vec![
                    Expect::Accepted,
                    facility(TEST_HARNESS),
                    rsp_k23(),
                    Expect::OneQueryResult,
                    pid3("RJ-439", "TEST", TEST_DOMAIN_OID),
                ],
            ),
        ],
    )
}

/// OHIE-CR-03: identifiers assigned from unknown authorities must be
/// rejected with error details
fn cr03() -> Scenario {
    let expect = || {
        vec![
            Expect::Rejected,
            facility(TEST_HARNESS),
            ack_a01(),
            Expect::HasErr,
        ]
    };
    Scenario::new(
        "OHIE-CR-03",
        "Rejects messages containing identifiers assigned by unknown authorities",
        vec![
            ScenarioStep::new("OHIE-CR-03-10", expect()),
            ScenarioStep::new("OHIE-CR-03-20", expect()),
        ],
    )
}

/// OHIE-CR-04: one authority must not assign identifiers from
/// another's identity domain
fn cr04() -> Scenario {
    Scenario::new(
        "OHIE-CR-04",
        "Prevents one assigning authority from assigning identifiers in another's domain",
        vec![
            ScenarioStep::new(
                "OHIE-CR-04-20",
                vec![Expect::Accepted, ack_a01(), facility(TEST_HARNESS_A)],
            ),
            ScenarioStep::new(
                "OHIE-CR-04-30",
                vec![
                    Expect::Rejected,
                    facility(TEST_HARNESS_B),
                    ack_a01(),
                    Expect::HasErr,
                ],
            ),
        ],
    )
}

/// OHIE-CR-05: a minimal record (identifier plus one of gender, birth
/// date, mother's identifier) must not be rejected
fn cr05() -> Scenario {
    Scenario::new(
        "OHIE-CR-05",
        "Accepts a minimal record carrying only an identifier and basic demographics",
        vec![
            ScenarioStep::new(
                "OHIE-CR-05-20",
                vec![Expect::Accepted, ack_a01(), facility(TEST_HARNESS)],
            ),
            ScenarioStep::new(
                "OHIE-CR-05-30",
                vec![
                    Expect::Accepted,
                    rsp_k23(),
                    facility(TEST_HARNESS),
                    Expect::OneQueryResult,
                    pid3("RJ-441", "TEST", TEST_DOMAIN_OID),
                ],
            ),
        ],
    )
}

/// OHIE-CR-06: records sharing a national identifier must be linked on
/// that identifier, not on demographics
fn cr06() -> Scenario {
    Scenario::new(
        "OHIE-CR-06",
        "Merges records on an explicit national identifier despite mismatched demographics",
        vec![
            ScenarioStep::new("OHIE-CR-06-20", vec![Expect::Accepted, ack_a01()]),
            ScenarioStep::new(
                "OHIE-CR-06-30",
                vec![Expect::Accepted, ack_a01(), facility(TEST_HARNESS_A)],
            ),
            ScenarioStep::new(
                "OHIE-CR-06-40",
                vec![
                    Expect::Accepted,
                    rsp_k23(),
                    facility(TEST_HARNESS_A),
                    Expect::OneQueryResult,
                    pid3("RJ-449", "TEST_A", TEST_A_DOMAIN_OID),
                ],
            ),
        ],
    )
}

fn pending(id: &str, description: &str) -> Scenario {
    Scenario::new(id, description, Vec::new())
}
