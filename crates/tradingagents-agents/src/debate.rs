use tracing::info;
use tradingagents_models::{AnalystKind, DebateKind, DebateRole, TradingState};

use crate::error::Interrupt;
use crate::prompts::{debate_turn_context, judge_context, system_prompt};
use crate::runner::AgentRunner;

/// Position of a debate in its round-robin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebatePhase {
    Turn { round: u32, role: DebateRole },
    Judge,
    Done,
}

/// Round-robin over the debate's roles for `max_rounds` rounds, then the judge.
///
/// The machine only advances; it holds no transcript. Every `Turn` it yields
/// must be recorded before `turn_taken` is called.
#[derive(Debug, Clone)]
pub struct DebateMachine {
    kind: DebateKind,
    max_rounds: u32,
    phase: DebatePhase,
}

impl DebateMachine {
    pub fn new(kind: DebateKind, max_rounds: u32) -> Self {
        let phase = if max_rounds == 0 {
            DebatePhase::Judge
        } else {
            DebatePhase::Turn {
                round: 1,
                role: kind.roles()[0],
            }
        };
        Self {
            kind,
            max_rounds,
            phase,
        }
    }

    pub fn kind(&self) -> DebateKind {
        self.kind
    }

    pub fn phase(&self) -> DebatePhase {
        self.phase
    }

    /// Turns taken before the judge speaks.
    pub fn total_turns(&self) -> usize {
        self.max_rounds as usize * self.kind.roles().len()
    }

    pub fn turn_taken(&mut self) {
        let DebatePhase::Turn { round, role } = self.phase else {
            return;
        };
        let roles = self.kind.roles();
        let idx = roles.iter().position(|r| *r == role).unwrap_or(roles.len() - 1);
        self.phase = if idx + 1 < roles.len() {
            DebatePhase::Turn {
                round,
                role: roles[idx + 1],
            }
        } else if round < self.max_rounds {
            DebatePhase::Turn {
                round: round + 1,
                role: roles[0],
            }
        } else {
            DebatePhase::Judge
        };
    }

    pub fn judged(&mut self) {
        if self.phase == DebatePhase::Judge {
            self.phase = DebatePhase::Done;
        }
    }
}

/// Drive one debate to completion and return the judge's raw reply.
pub(crate) async fn run_debate(
    runner: &AgentRunner,
    state: &mut TradingState,
    kind: DebateKind,
    max_rounds: u32,
    analysts: &[AnalystKind],
) -> Result<String, Interrupt> {
    let stage = kind.stage();
    let mut machine = DebateMachine::new(kind, max_rounds);
    let mut verdict = String::new();

    loop {
        match machine.phase() {
            DebatePhase::Turn { round, role } => {
                let context = debate_turn_context(state, kind, role, round, analysts);
                let response = runner
                    .invoke(role.into(), system_prompt(role.into()), context, Vec::new())
                    .await?;
                let recorded = match kind {
                    DebateKind::Research => state.record_research_turn(role, response.text),
                    DebateKind::Risk => state.record_risk_turn(role, response.text),
                };
                recorded.map_err(|source| Interrupt::State { stage, source })?;
                info!(stage = %stage, round, role = %role, "Debate turn recorded");
                machine.turn_taken();
            }
            DebatePhase::Judge => {
                let judge = kind.judge();
                let context = judge_context(state, kind, analysts);
                let response = runner
                    .invoke(judge, system_prompt(judge), context, Vec::new())
                    .await?;
                verdict = response.text;
                machine.judged();
            }
            DebatePhase::Done => return Ok(verdict),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(machine: &mut DebateMachine) -> Vec<(u32, DebateRole)> {
        let mut turns = Vec::new();
        while let DebatePhase::Turn { round, role } = machine.phase() {
            turns.push((round, role));
            machine.turn_taken();
        }
        turns
    }

    #[test]
    fn research_alternates_bull_first() {
        let mut machine = DebateMachine::new(DebateKind::Research, 2);
        let turns = drain(&mut machine);
        assert_eq!(
            turns,
            vec![
                (1, DebateRole::Bull),
                (1, DebateRole::Bear),
                (2, DebateRole::Bull),
                (2, DebateRole::Bear),
            ]
        );
        assert_eq!(machine.phase(), DebatePhase::Judge);
        assert_eq!(machine.total_turns(), 4);
    }

    #[test]
    fn risk_order_per_round() {
        for rounds in 1..=4 {
            let mut machine = DebateMachine::new(DebateKind::Risk, rounds);
            let turns = drain(&mut machine);
            assert_eq!(turns.len(), 3 * rounds as usize);
            for (i, (round, role)) in turns.iter().enumerate() {
                assert_eq!(*round, i as u32 / 3 + 1);
                assert_eq!(*role, DebateKind::Risk.roles()[i % 3]);
            }
        }
    }

    #[test]
    fn judge_then_done() {
        let mut machine = DebateMachine::new(DebateKind::Research, 1);
        drain(&mut machine);
        machine.judged();
        assert_eq!(machine.phase(), DebatePhase::Done);
        machine.turn_taken();
        machine.judged();
        assert_eq!(machine.phase(), DebatePhase::Done);
    }

    #[test]
    fn judged_ignored_mid_debate() {
        let mut machine = DebateMachine::new(DebateKind::Research, 1);
        machine.judged();
        assert_eq!(
            machine.phase(),
            DebatePhase::Turn {
                round: 1,
                role: DebateRole::Bull
            }
        );
    }
}
