//! Fixed ConnectWise identifiers the pipeline routes against.

/// Company id the intake integration assigns when it cannot resolve an organization.
pub const NO_COMPANY_ID: i64 = 24557;
pub const CADUCEUS_HEALTH_COMPANY_ID: i64 = 47941;

// ── Statuses ──────────────────────────────────────────────────────────────

pub const TRIAGE_REVIEW_STATUS_ID: i64 = 4084;
pub const CLOSING_STATUS_ID: i64 = 163;
pub const NOC_IN_QUEUE_STATUS_ID: i64 = 1052;

// ── Types ─────────────────────────────────────────────────────────────────

pub const CONTINUAL_SERVICE_IMPROVEMENT_TYPE_ID: i64 = 7864;

/// Contact type id marking a VIP contact.
pub const VIP_CONTACT_TYPE_ID: i64 = 17;

// ── Boards ────────────────────────────────────────────────────────────────

pub const L1_BOARD_ID: i64 = 150;
pub const L2_BOARD_ID: i64 = 151;
pub const L3_BOARD_ID: i64 = 149;
pub const SECURITY_BOARD_ID: i64 = 35;
pub const SECURITY_ENG_BOARD_ID: i64 = 154;
pub const SECURITY_RISK_ADVISORY_BOARD_ID: i64 = 155;
pub const NOC_BOARD_ID: i64 = 52;
pub const CLIENT_STRATEGY_BOARD_ID: i64 = 54;
pub const HELP_DESK_BOARD_ID: i64 = 3;
pub const FIELD_SERVICES_BOARD_ID: i64 = 139;
pub const CADUCEUS_BOARD_ID: i64 = 184;

/// Boards the router may pick for tickets that still need service work.
pub const ROUTING_CANDIDATE_BOARDS: [i64; 6] = [
    L1_BOARD_ID,
    L2_BOARD_ID,
    L3_BOARD_ID,
    CADUCEUS_BOARD_ID,
    SECURITY_BOARD_ID,
    NOC_BOARD_ID,
];

pub const NON_SERVICE_BOARDS: [i64; 4] = [
    HELP_DESK_BOARD_ID,
    CLIENT_STRATEGY_BOARD_ID,
    FIELD_SERVICES_BOARD_ID,
    SECURITY_ENG_BOARD_ID,
];

pub const TIERED_SERVICE_BOARDS: [i64; 3] = [L1_BOARD_ID, L2_BOARD_ID, L3_BOARD_ID];

// ── Sales activities ──────────────────────────────────────────────────────

pub const ACTIVITY_TYPE_SPAM: i64 = 64;
pub const ACTIVITY_TYPE_POSSIBLE_SPAM: i64 = 65;
pub const ACTIVITY_TYPE_BOARD_SUCCESS: i64 = 66;
pub const ACTIVITY_TYPE_BOARD_FAILURE: i64 = 67;

pub const ACTIVITY_ASSIGNEE_ID: i64 = 645;
pub const ACTIVITY_LOCATION_ID: i64 = 2;
pub const ACTIVITY_CLOSED_STATUS_ID: i64 = 2;

// ── Thresholds ────────────────────────────────────────────────────────────

pub const BOARD_CONFIDENCE_THRESHOLD: i32 = 90;
pub const POSSIBLE_SPAM_CONFIDENCE: i32 = 95;
pub const CERTAIN_SPAM_CONFIDENCE: i32 = 100;
pub const SUMMARY_MAX_CHARS: usize = 100;
