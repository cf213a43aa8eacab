// racer_core/src/vehicle/classify.rs

//! Turns the flat part list of a loaded car into a canonical skeleton:
//! one body, four wheels and an ordered list of miscellaneous parts.
//!
//! The naming conventions differ per source title, and some titles change
//! convention with the number of exported parts. All of that lives in the
//! static rule tables below; `classify` only evaluates them.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::ClassifyError;
use crate::vehicle::parts::{MeshPart, SourceTitle, WheelSlot};

// =========================================================================
// == Rule Table Types ==
// =========================================================================

/// How a rule selects a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// The part at this position of the loader output.
    Index(usize),
    /// A part whose name is exactly this string.
    Exact(&'static str),
    /// A part whose name contains `needle`, unless it also contains `unless`.
    Contains {
        needle: &'static str,
        unless: Option<&'static str>,
    },
}

impl Matcher {
    fn matches_name(&self, name: &str) -> bool {
        match self {
            Matcher::Index(_) => false,
            Matcher::Exact(expected) => name == *expected,
            Matcher::Contains { needle, unless } => {
                name.contains(needle) && !unless.is_some_and(|u| name.contains(u))
            }
        }
    }
}

/// Where a matched part ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Body,
    Wheel(WheelSlot),
    /// A single low-detail wheel mesh reused for all four slots.
    AllWheels,
    Misc { enabled: bool },
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub matcher: Matcher,
    pub destination: Destination,
}

/// The rules used for one title when the part count is below `max_parts`
/// (or always, when `max_parts` is `None`).
///
/// In the few-parts NFS2 layout only part 0 (wheel) and part 1 (body) are
/// bound. A further distinct part becomes disabled misc; a repeat of the
/// wheel or body mesh becomes an alias.
#[derive(Debug, Clone, Copy)]
pub struct RuleSet {
    pub max_parts: Option<usize>,
    pub rules: &'static [Rule],
}

impl RuleSet {
    fn admits(&self, part_count: usize) -> bool {
        self.max_parts.map_or(true, |max| part_count < max)
    }
}

const fn index(i: usize, destination: Destination) -> Rule {
    Rule {
        matcher: Matcher::Index(i),
        destination,
    }
}

const fn exact(name: &'static str, destination: Destination) -> Rule {
    Rule {
        matcher: Matcher::Exact(name),
        destination,
    }
}

const fn contains(needle: &'static str, destination: Destination) -> Rule {
    Rule {
        matcher: Matcher::Contains {
            needle,
            unless: None,
        },
        destination,
    }
}

const fn contains_unless(
    needle: &'static str,
    unless: &'static str,
    destination: Destination,
) -> Rule {
    Rule {
        matcher: Matcher::Contains {
            needle,
            unless: Some(unless),
        },
        destination,
    }
}

use Destination::{AllWheels, Body, Misc, Wheel};
use WheelSlot::{FrontLeft, FrontRight, RearLeft, RearRight};

const ENABLED_MISC: Destination = Misc { enabled: true };

// =========================================================================
// == Rule Tables ==
// =========================================================================

/// NFS2, NFS2 SE and the PS1 port of NFS3 share one exporter.
static NFS2_FAMILY: [RuleSet; 3] = [
    RuleSet {
        max_parts: Some(4),
        rules: &[index(0, AllWheels), index(1, Body)],
    },
    RuleSet {
        max_parts: Some(20),
        rules: &[
            index(2, AllWheels),
            exact("Medium Main Body Part", Body),
            contains_unless("Medium", "Wheel", ENABLED_MISC),
        ],
    },
    RuleSet {
        max_parts: None,
        rules: &[
            exact("High Main Body Part", Body),
            contains("High Front Left Wheel Part", Wheel(FrontLeft)),
            contains("High Front Right Wheel Part", Wheel(FrontRight)),
            contains("High Rear Left Wheel Part", Wheel(RearLeft)),
            contains("High Rear Right Wheel Part", Wheel(RearRight)),
            contains("High", ENABLED_MISC),
        ],
    },
];

/// A medium-detail NFS3 export is the body followed by four wheels.
static NFS3: [RuleSet; 2] = [
    RuleSet {
        max_parts: Some(6),
        rules: &[
            index(0, Body),
            contains("medium l front wheel", Wheel(FrontLeft)),
            contains("medium r front wheel", Wheel(FrontRight)),
            contains("medium l rear wheel", Wheel(RearLeft)),
            contains("medium r rear wheel", Wheel(RearRight)),
        ],
    },
    RuleSet {
        max_parts: None,
        rules: &[
            exact("high body", Body),
            contains("left front wheel", Wheel(FrontLeft)),
            contains("right front wheel", Wheel(FrontRight)),
            contains("left rear wheel", Wheel(RearLeft)),
            contains("right rear wheel", Wheel(RearRight)),
        ],
    },
];

static NFS4: [RuleSet; 1] = [RuleSet {
    max_parts: None,
    rules: &[
        exact(":HB", Body),
        exact(":HLRW", Wheel(RearLeft)),
        exact(":HLFW", Wheel(FrontLeft)),
        exact(":HRRW", Wheel(RearRight)),
        exact(":HRFW", Wheel(FrontRight)),
        contains("O", ENABLED_MISC),
    ],
}];

/// Returns the rule sets for a title, or `None` when the title has no known
/// part convention.
pub fn rule_table(title: SourceTitle) -> Option<&'static [RuleSet]> {
    match title {
        SourceTitle::Nfs2 | SourceTitle::Nfs2Se | SourceTitle::Nfs3Ps1 => Some(&NFS2_FAMILY),
        SourceTitle::Nfs3 => Some(&NFS3),
        SourceTitle::Nfs4 => Some(&NFS4),
        SourceTitle::Nfs1 | SourceTitle::Nfs2Ps1 | SourceTitle::Nfs5 | SourceTitle::Unknown => {
            None
        }
    }
}

// =========================================================================
// == Classification Output ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiscEntry {
    pub index: usize,
    pub enabled: bool,
}

/// Indices into the classified part list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleSkeleton {
    pub body: usize,
    /// Indexed by `WheelSlot::index()`.
    pub wheels: [usize; 4],
    pub misc: Vec<MiscEntry>,
    /// Parts that duplicate the mesh of the body or a wheel. They are owned
    /// through that part and never enabled on their own.
    pub aliases: Vec<usize>,
}

impl VehicleSkeleton {
    pub fn wheel(&self, slot: WheelSlot) -> usize {
        self.wheels[slot.index()]
    }

    /// True when all four slots point at one reused mesh.
    pub fn shares_wheel_mesh(&self) -> bool {
        self.wheels.iter().all(|&w| w == self.wheels[0])
    }

    /// Every part that is switched on, each listed once.
    pub fn enabled_indices(&self) -> BTreeSet<usize> {
        let mut enabled: BTreeSet<usize> = self.wheels.iter().copied().collect();
        enabled.insert(self.body);
        enabled.extend(self.misc.iter().filter(|m| m.enabled).map(|m| m.index));
        enabled
    }
}

// =========================================================================
// == Classification ==
// =========================================================================

#[derive(Default)]
struct Binding {
    body: Option<usize>,
    wheels: [Option<usize>; 4],
    misc: Vec<MiscEntry>,
    aliases: Vec<usize>,
}

impl Binding {
    fn is_free(&self, destination: Destination) -> bool {
        match destination {
            Body => self.body.is_none(),
            Wheel(slot) => self.wheels[slot.index()].is_none(),
            AllWheels => self.wheels.iter().all(Option::is_none),
            Misc { .. } => true,
        }
    }

    fn bind(&mut self, index: usize, destination: Destination) {
        match destination {
            Body => self.body = Some(index),
            Wheel(slot) => self.wheels[slot.index()] = Some(index),
            AllWheels => self.wheels = [Some(index); 4],
            Misc { enabled } => self.misc.push(MiscEntry { index, enabled }),
        }
    }

    /// Body and wheel parts already bound, used to spot duplicated meshes.
    fn bound_parts(&self) -> impl Iterator<Item = usize> + '_ {
        self.body.into_iter().chain(self.wheels.iter().flatten().copied())
    }
}

/// Classifies a car's parts according to the rule table of `title`.
///
/// Index rules bind first. The exact-name rules are then offered every
/// remaining part before any substring rule is, so an exact name always
/// beats a substring hit for the same slot. Within a pass parts are taken in
/// input order and the first rule that matches and whose slot is still free
/// wins. Parts no rule wants become disabled misc parts, so nothing the
/// loader delivered is lost.
///
/// # Errors
/// * `UnsupportedTitle` when the title has no rule table.
/// * `NoRuleSet` when no variant of the table admits the part count.
/// * `PartIndexOutOfRange` when an index rule points past the input.
/// * `IncompleteSkeleton` when the body or a wheel slot stays empty.
pub fn classify(parts: &[MeshPart], title: SourceTitle) -> Result<VehicleSkeleton, ClassifyError> {
    let table = rule_table(title).ok_or(ClassifyError::UnsupportedTitle(title))?;
    let rule_set = table
        .iter()
        .find(|set| set.admits(parts.len()))
        .ok_or(ClassifyError::NoRuleSet {
            title,
            part_count: parts.len(),
        })?;
    classify_with(parts, title, rule_set)
}

fn classify_with(
    parts: &[MeshPart],
    title: SourceTitle,
    rule_set: &RuleSet,
) -> Result<VehicleSkeleton, ClassifyError> {
    let mut binding = Binding::default();
    let mut consumed = vec![false; parts.len()];

    // --- Pass 1: positional rules ---
    for rule in rule_set.rules {
        if let Matcher::Index(i) = rule.matcher {
            if i >= parts.len() {
                return Err(ClassifyError::PartIndexOutOfRange {
                    title,
                    index: i,
                    part_count: parts.len(),
                });
            }
            if binding.is_free(rule.destination) && !consumed[i] {
                binding.bind(i, rule.destination);
                consumed[i] = true;
            }
        }
    }

    // --- Pass 2: exact names, then substrings, then leftovers ---
    let exact_rules: Vec<&Rule> = rule_set
        .rules
        .iter()
        .filter(|r| matches!(r.matcher, Matcher::Exact(_)))
        .collect();
    let substring_rules: Vec<&Rule> = rule_set
        .rules
        .iter()
        .filter(|r| matches!(r.matcher, Matcher::Contains { .. }))
        .collect();

    offer(parts, &mut consumed, &mut binding, &exact_rules, None);
    offer(parts, &mut consumed, &mut binding, &substring_rules, None);
    offer(
        parts,
        &mut consumed,
        &mut binding,
        &[],
        Some(Misc { enabled: false }),
    );

    binding.misc.sort_by_key(|m| m.index);
    binding.aliases.sort_unstable();
    finish(binding, title)
}

/// Offers every unconsumed part to `rules` in input order. A part repeating
/// the mesh of a bound body or wheel is recorded as an alias instead. Parts
/// no rule takes go to `fallback`, or stay unconsumed without one.
fn offer(
    parts: &[MeshPart],
    consumed: &mut [bool],
    binding: &mut Binding,
    rules: &[&Rule],
    fallback: Option<Destination>,
) {
    for (i, part) in parts.iter().enumerate() {
        if consumed[i] {
            continue;
        }
        if binding.bound_parts().any(|b| parts[b].same_mesh(part)) {
            binding.aliases.push(i);
            consumed[i] = true;
            continue;
        }

        let destination = rules
            .iter()
            .find(|r| r.matcher.matches_name(&part.name) && binding.is_free(r.destination))
            .map(|r| r.destination)
            .or(fallback);
        if let Some(destination) = destination {
            binding.bind(i, destination);
            consumed[i] = true;
        }
    }
}

fn finish(binding: Binding, title: SourceTitle) -> Result<VehicleSkeleton, ClassifyError> {
    let mut missing = Vec::new();
    if binding.body.is_none() {
        missing.push("body".to_string());
    }
    for slot in WheelSlot::ALL {
        if binding.wheels[slot.index()].is_none() {
            missing.push(format!("{slot} wheel"));
        }
    }

    match (binding.body, binding.wheels) {
        (Some(body), [Some(fl), Some(fr), Some(rl), Some(rr)]) => {
            let skeleton = VehicleSkeleton {
                body,
                wheels: [fl, fr, rl, rr],
                misc: binding.misc,
                aliases: binding.aliases,
            };
            debug!(
                "Classified {} car: body #{}, wheels {:?}, {} misc, {} aliased",
                title,
                skeleton.body,
                skeleton.wheels,
                skeleton.misc.len(),
                skeleton.aliases.len()
            );
            Ok(skeleton)
        }
        _ => Err(ClassifyError::IncompleteSkeleton {
            title,
            missing: missing.join(", "),
        }),
    }
}
