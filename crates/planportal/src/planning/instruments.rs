//! Known Local Environmental Plans with the development control plan and
//! council each one belongs to.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningInstrument {
    pub lep: &'static str,
    pub dcp: &'static str,
    pub council: &'static str,
}

const fn instrument(lep: &'static str, dcp: &'static str, council: &'static str) -> PlanningInstrument {
    PlanningInstrument { lep, dcp, council }
}

pub const INSTRUMENTS: &[PlanningInstrument] = &[
    instrument(
        "Blacktown Local Environmental Plan 2015",
        "Blacktown Development Control Plan 2015",
        "Blacktown",
    ),
    instrument(
        "Camden Local Environmental Plan 2010",
        "Camden Development Control Plan 2019",
        "Camden",
    ),
    instrument(
        "Campbelltown Local Environmental Plan 2015",
        "Campbelltown (Sustainable City) Development Control Plan 2015",
        "Campbelltown",
    ),
    instrument(
        "Canterbury-Bankstown Local Environmental Plan 2023",
        "Canterbury-Bankstown Development Control Plan 2023",
        "Canterbury-Bankstown",
    ),
    instrument(
        "Cumberland Local Environmental Plan 2021",
        "Cumberland Development Control Plan 2021",
        "Cumberland",
    ),
    instrument(
        "Fairfield Local Environmental Plan 2013",
        "Fairfield City Wide Development Control Plan 2013",
        "Fairfield",
    ),
    instrument(
        "Georges River Local Environmental Plan 2021",
        "Georges River Development Control Plan 2021",
        "Georges River",
    ),
    instrument(
        "Hornsby Local Environmental Plan 2013",
        "Hornsby Development Control Plan 2024",
        "Hornsby",
    ),
    instrument(
        "Liverpool Local Environmental Plan 2008",
        "Liverpool Development Control Plan 2008",
        "Liverpool",
    ),
    instrument(
        "Parramatta Local Environmental Plan 2023",
        "Parramatta Development Control Plan 2023",
        "Parramatta",
    ),
    instrument(
        "Penrith Local Environmental Plan 2010",
        "Penrith Development Control Plan 2014",
        "Penrith",
    ),
    instrument(
        "Sydney Local Environmental Plan 2012",
        "Sydney Development Control Plan 2012",
        "City of Sydney",
    ),
    instrument(
        "The Hills Local Environmental Plan 2019",
        "The Hills Development Control Plan 2012",
        "The Hills Shire",
    ),
];

/// Instrument for an LEP name, compared case-insensitively.
pub fn lookup_by_lep(lep: &str) -> Option<&'static PlanningInstrument> {
    let lep = lep.trim();
    INSTRUMENTS.iter().find(|i| i.lep.eq_ignore_ascii_case(lep))
}

/// Instrument for a council name, compared case-insensitively.
pub fn lookup_by_council(council: &str) -> Option<&'static PlanningInstrument> {
    let council = council.trim();
    INSTRUMENTS
        .iter()
        .find(|i| i.council.eq_ignore_ascii_case(council))
}
