//! "Is this response usable?" classification.
//!
//! The verdict is a convenience for callers that only care about all-or-nothing
//! success. Callers handling partial success still have to walk the per-item
//! results; a negative verdict says nothing about which items failed.
//!
//! # Algorithm
//!
//! 1. A service result that does not pass the policy makes the whole response
//!    not good; per-item results are ignored.
//! 2. Otherwise every per-item status (including nested history update
//!    operation results) must pass the policy.
//! 3. When the request's input size is known, the result array must have
//!    exactly that many entries; fewer or more signals dropped results. An
//!    empty result array is good only when the input array was empty too.

use crate::service::{ServiceRequest, ServiceResponse};
use crate::status::{Severity, StatusCode};

/// How Uncertain statuses are classified.
///
/// The same rule applies to the service result and to every per-item status,
/// for all four services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultPolicy {
    /// When true, Uncertain counts as good (availability over quality).
    pub accept_uncertain: bool,
}

impl ResultPolicy {
    /// Only Good passes.
    pub const STRICT: ResultPolicy = ResultPolicy {
        accept_uncertain: false,
    };

    /// Good and Uncertain pass; only Bad fails.
    pub const LENIENT: ResultPolicy = ResultPolicy {
        accept_uncertain: true,
    };

    #[must_use]
    pub fn passes(self, status: StatusCode) -> bool {
        match status.severity() {
            Severity::Good => true,
            Severity::Uncertain => self.accept_uncertain,
            Severity::Bad => false,
        }
    }

    /// Classifies `response`.
    ///
    /// `requested` is the size of the request's input array, when known. A
    /// result count that differs from it is not good. With `None`, an empty
    /// result array is treated as dropped results.
    #[must_use]
    pub fn is_good<R: ServiceResponse + ?Sized>(self, response: &R, requested: Option<usize>) -> bool {
        if !self.passes(response.response_header().service_result) {
            return false;
        }
        let count = response.result_count();
        match requested {
            Some(n) if n != count => return false,
            None if count == 0 => return false,
            _ => {}
        }
        if count == 0 {
            return true;
        }
        response.item_statuses().into_iter().all(|s| self.passes(s))
    }

    /// Classifies `response` against the request that produced it.
    #[must_use]
    pub fn is_good_for<Q: ServiceRequest>(self, request: &Q, response: &Q::Response) -> bool {
        self.is_good(response, Some(request.item_count()))
    }
}

/// Strict verdict for a response whose request is not at hand.
#[must_use]
pub fn is_good<R: ServiceResponse + ?Sized>(response: &R) -> bool {
    ResultPolicy::STRICT.is_good(response, None)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::data_value::DataValue;
    use crate::header::ResponseHeader;
    use crate::identifiers::NodeId;
    use crate::messages::{
        HistoryReadResponse, HistoryReadResult, ReadRequest, ReadResponse, WriteResponse,
    };

    fn write_response(service_result: StatusCode, results: Vec<StatusCode>) -> WriteResponse {
        WriteResponse {
            header: ResponseHeader {
                service_result,
                ..Default::default()
            },
            results,
            diagnostic_infos: Vec::new(),
        }
    }

    #[test]
    fn bad_service_result_overrides_items() {
        let resp = write_response(StatusCode::BadTimeout, vec![StatusCode::Good]);
        assert!(!is_good(&resp));
        assert!(!ResultPolicy::LENIENT.is_good(&resp, Some(1)));
    }

    #[test]
    fn one_bad_item_spoils_the_verdict() {
        let resp = write_response(
            StatusCode::Good,
            vec![StatusCode::Good, StatusCode::BadNodeIdUnknown, StatusCode::Good],
        );
        assert!(!resp.is_good());
    }

    #[test]
    fn uncertain_depends_on_policy() {
        let resp = write_response(StatusCode::Good, vec![StatusCode::Good, StatusCode::Uncertain]);
        assert!(!ResultPolicy::STRICT.is_good(&resp, Some(2)));
        assert!(ResultPolicy::LENIENT.is_good(&resp, Some(2)));

        let uncertain_service = write_response(StatusCode::Uncertain, vec![StatusCode::Good]);
        assert!(!ResultPolicy::STRICT.is_good(&uncertain_service, Some(1)));
        assert!(ResultPolicy::LENIENT.is_good(&uncertain_service, Some(1)));
    }

    #[test]
    fn default_policy_is_strict() {
        assert_eq!(ResultPolicy::default(), ResultPolicy::STRICT);
    }

    #[test]
    fn empty_results_need_an_empty_request() {
        let resp = write_response(StatusCode::Good, Vec::new());
        assert!(!is_good(&resp));
        assert!(!ResultPolicy::STRICT.is_good(&resp, Some(3)));
        assert!(ResultPolicy::STRICT.is_good(&resp, Some(0)));
    }

    #[test]
    fn short_results_are_dropped_results() {
        let resp = write_response(StatusCode::Good, vec![StatusCode::Good, StatusCode::Good]);
        assert!(!ResultPolicy::STRICT.is_good(&resp, Some(3)));
        assert!(!ResultPolicy::LENIENT.is_good(&resp, Some(3)));
        assert!(ResultPolicy::STRICT.is_good(&resp, Some(2)));
        // Without the request at hand only the per-item statuses can be judged.
        assert!(is_good(&resp));
    }

    #[test]
    fn short_results_fail_against_request() {
        let req = ReadRequest::new(vec![
            NodeId::numeric(0, 2258).into(),
            NodeId::numeric(0, 2259).into(),
        ]);
        let resp = ReadResponse {
            header: ResponseHeader::good(&req.header),
            results: vec![DataValue::new_now(true)],
            diagnostic_infos: Vec::new(),
        };
        assert!(!ResultPolicy::STRICT.is_good_for(&req, &resp));
    }

    #[test]
    fn verdict_against_request() {
        let req = ReadRequest::for_node(NodeId::numeric(0, 2258));
        let resp = ReadResponse {
            header: ResponseHeader::good(&req.header),
            results: vec![DataValue::new_now(true)],
            diagnostic_infos: Vec::new(),
        };
        assert!(ResultPolicy::STRICT.is_good_for(&req, &resp));
    }

    #[test]
    fn history_read_uses_result_status_codes() {
        let resp = HistoryReadResponse {
            header: ResponseHeader::default(),
            results: vec![
                HistoryReadResult::default(),
                HistoryReadResult::failed(StatusCode::BadContinuationPointInvalid),
            ],
            diagnostic_infos: Vec::new(),
        };
        assert!(!resp.is_good());
    }

    fn arb_status() -> impl Strategy<Value = StatusCode> {
        prop_oneof![
            Just(StatusCode::Good),
            Just(StatusCode::GoodMoreData),
            Just(StatusCode::GoodEntryInserted),
            Just(StatusCode::Uncertain),
            Just(StatusCode::BadNodeIdUnknown),
            Just(StatusCode::BadTimeout),
            Just(StatusCode::BadContinuationPointInvalid),
            any::<u32>().prop_map(StatusCode),
        ]
    }

    proptest! {
        #[test]
        fn prop_bad_service_result_is_never_good(
            sub in 0_u32..0x4000_0000,
            items in proptest::collection::vec(arb_status(), 0..8),
            lenient in any::<bool>(),
        ) {
            let service_result = StatusCode(0x8000_0000 | sub);
            let resp = write_response(service_result, items.clone());
            let policy = ResultPolicy { accept_uncertain: lenient };
            prop_assert!(!policy.is_good(&resp, Some(items.len())));
        }

        #[test]
        fn prop_count_mismatch_is_never_good(
            items in proptest::collection::vec(arb_status(), 0..8),
            requested in 0_usize..10,
            lenient in any::<bool>(),
        ) {
            prop_assume!(requested != items.len());
            let resp = write_response(StatusCode::Good, items);
            let policy = ResultPolicy { accept_uncertain: lenient };
            prop_assert!(!policy.is_good(&resp, Some(requested)));
        }

        #[test]
        fn prop_good_iff_every_item_passes(
            items in proptest::collection::vec(arb_status(), 1..8),
            lenient in any::<bool>(),
        ) {
            let resp = write_response(StatusCode::Good, items.clone());
            let policy = ResultPolicy { accept_uncertain: lenient };
            let expected = items.iter().all(|s| policy.passes(*s));
            prop_assert_eq!(policy.is_good(&resp, Some(items.len())), expected);
        }

        #[test]
        fn prop_lenient_accepts_whatever_strict_accepts(
            items in proptest::collection::vec(arb_status(), 0..8),
            service_result in arb_status(),
        ) {
            let resp = write_response(service_result, items.clone());
            if ResultPolicy::STRICT.is_good(&resp, Some(items.len())) {
                prop_assert!(ResultPolicy::LENIENT.is_good(&resp, Some(items.len())));
            }
        }
    }
}
