//! # Transaction Classification
//!
//! Satu raw tx → satu ledger `Tx` (atau `None` kalau tidak relevan).
//!
//! ```text
//! RawTx ─► TempTx ─► resolve_inputs ─► relevant? ──no──► None
//!                                         │
//!                                        yes
//!                                         ▼
//!                                 classify_outputs
//!                                         ▼
//!                        fee/phase check per tag (Irregular?)
//!                                         ▼
//!                                  evaluate tx type
//!                                         ▼
//!                           Invalid? ⇒ semua value dibakar
//! ```
//!
//! Irregular: value dipertahankan, output tag-specific diturunkan ke
//! `TokenOutput`/`PlainOutput`. Invalid: semua output menjadi ordinary
//! value dan seluruh input value tercatat sebagai `burnt_value`.

use tracing::{debug, info, warn};

use super::internal_inputs::{resolve_inputs, InputResolution, InputState};
use super::internal_outputs::{classify_outputs, OutputClassification};
use crate::block::{TempTx, Tx, TxOutputType, TxType};
use crate::opreturn::OpReturnType;
use crate::param::Param;
use crate::period::DaoPhase;
use crate::raw::RawTx;
use crate::state::{invariant_violation, BlockWindow, GenesisParams, LedgerState};
use crate::DaoError;

/// Tx yang sudah diklasifikasi beserta anomali yang ditemukan.
#[derive(Debug)]
pub struct ClassifiedTx {
    pub tx: Tx,
    /// `Irregular` atau `StructuralInvalid`; None untuk tx normal.
    pub issue: Option<DaoError>,
}

/// Scratch record dengan height/hash dari block yang sedang dibuka.
/// Field height di raw tx tidak dipercaya.
fn temp_tx(raw: &RawTx, window: &BlockWindow<'_>) -> TempTx {
    let mut temp = TempTx::from_raw(raw);
    let height = window.height();
    temp.block_height = height;
    if let Some(block) = window.ledger().last_block() {
        temp.block_hash = block.hash;
    }
    for out in &mut temp.outputs {
        out.block_height = height;
    }
    temp
}

pub(crate) fn classify_tx(window: &mut BlockWindow<'_>, raw: &RawTx) -> Option<ClassifiedTx> {
    if window.ledger().tx(&raw.id).is_some() {
        warn!("tx {} already in ledger, ignored", raw.id.short());
        return None;
    }
    let mut temp = temp_tx(raw, window);

    let genesis = *window.ledger().genesis();
    if temp.block_height == genesis.height && temp.id == genesis.tx_id {
        return Some(ClassifiedTx { tx: classify_genesis(temp, &genesis), issue: None });
    }

    let inputs = resolve_inputs(window, &temp);
    if !inputs.is_relevant() {
        return None;
    }

    let outputs = classify_outputs(window.ledger(), &mut temp, &inputs);
    let issue = decide_tx_type(window.ledger(), &mut temp, &inputs, &outputs);
    let tx = Tx::from_temp(temp);
    match &issue {
        Some(e) => info!("{}", e),
        None => debug!("tx {} classified as {:?}", tx.id.short(), tx.tx_type),
    }
    Some(ClassifiedTx { tx, issue })
}

// ════════════════════════════════════════════════════════════════════════════
// GENESIS
// ════════════════════════════════════════════════════════════════════════════

fn classify_genesis(mut temp: TempTx, genesis: &GenesisParams) -> Tx {
    let mut remaining = genesis.total_supply;
    for out in &mut temp.outputs {
        if out.value > remaining {
            invariant_violation(format!(
                "genesis tx {} distributes more than total supply {}",
                temp.id, genesis.total_supply
            ));
        }
        remaining -= out.value;
        out.output_type = TxOutputType::GenesisOutput;
    }
    info!(
        "genesis tx {} at height {}: {} outputs, {} undistributed",
        temp.id,
        temp.block_height,
        temp.outputs.len(),
        remaining
    );
    temp.tx_type = Some(TxType::Genesis);
    Tx::from_temp(temp)
}

// ════════════════════════════════════════════════════════════════════════════
// TX TYPE
// ════════════════════════════════════════════════════════════════════════════

fn irregular(temp: &mut TempTx, reason: String) -> Option<DaoError> {
    temp.tx_type = Some(TxType::Irregular);
    Some(DaoError::Irregular { tx_id: temp.id, reason })
}

fn demote_output(temp: &mut TempTx, from: TxOutputType, to: TxOutputType) {
    for out in temp.outputs.iter_mut().filter(|o| o.output_type == from) {
        out.output_type = to;
    }
}

fn decide_tx_type(
    ledger: &LedgerState,
    temp: &mut TempTx,
    inputs: &InputResolution,
    outputs: &OutputClassification,
) -> Option<DaoError> {
    let height = temp.block_height;
    let burnt = outputs.available;
    temp.burnt_value = burnt;
    temp.burnt_bond_value = inputs.burnt_bond;

    let mut issue = None;
    match outputs.op_type {
        Some(OpReturnType::Proposal) => {
            let fee = ledger.param_value(Param::ProposalFee, height);
            if burnt != fee || !ledger.is_in_phase(height, DaoPhase::Proposal) {
                issue = irregular(temp, format!("proposal burns {} (fee {}) or wrong phase", burnt, fee));
            }
        }
        Some(op) if op.is_funding_request() => {
            let fee = ledger.param_value(Param::ProposalFee, height);
            if burnt != fee || !ledger.is_in_phase(height, DaoPhase::Proposal) {
                demote_output(temp, TxOutputType::IssuanceCandidate, TxOutputType::PlainOutput);
                issue = irregular(temp, format!("funding request burns {} (fee {}) or wrong phase", burnt, fee));
            }
        }
        Some(OpReturnType::BlindVote) => {
            let fee = ledger.param_value(Param::BlindVoteFee, height);
            if burnt != fee || !ledger.is_in_phase(height, DaoPhase::BlindVote) {
                demote_output(temp, TxOutputType::BlindVoteLockStake, TxOutputType::TokenOutput);
                issue = irregular(temp, format!("blind vote burns {} (fee {}) or wrong phase", burnt, fee));
            }
        }
        Some(OpReturnType::VoteReveal) => {
            if !ledger.is_in_phase(height, DaoPhase::VoteReveal) || inputs.vote_reveal_input != InputState::Valid {
                demote_output(temp, TxOutputType::VoteRevealUnlockStake, TxOutputType::TokenOutput);
                issue = irregular(temp, "vote reveal outside phase or without exactly one stake input".to_string());
            }
        }
        _ => {}
    }

    let structural = structural_fault(outputs);
    if let Some(reason) = structural {
        return invalidate(temp, inputs, reason);
    }

    if temp.tx_type.is_none() {
        match evaluate_tx_type(temp, inputs, outputs) {
            Ok(t) => temp.tx_type = Some(t),
            Err(reason) => return invalidate(temp, inputs, reason),
        }
    }

    if temp.outputs.iter().any(|o| o.output_type == TxOutputType::Undefined) {
        return invalidate(temp, inputs, "unclassified output".to_string());
    }
    if inputs.burnt_bond > 0 {
        return invalidate(temp, inputs, format!("unlock output spent early, {} bond burned", inputs.burnt_bond));
    }
    issue
}

fn structural_fault(outputs: &OutputClassification) -> Option<String> {
    if outputs.op_return_outputs > 1 {
        return Some(format!("{} application-data outputs", outputs.op_return_outputs));
    }
    if outputs.misplaced_op_return {
        return Some("application data on a non-final or non-zero output".to_string());
    }
    if outputs.op_return_invalid {
        return Some("undecodable application data".to_string());
    }
    None
}

fn evaluate_tx_type(
    temp: &TempTx,
    inputs: &InputResolution,
    outputs: &OutputClassification,
) -> Result<TxType, String> {
    let first_type = temp.outputs.first().map(|o| o.output_type);
    match outputs.op_type {
        Some(OpReturnType::Proposal) => Ok(TxType::Proposal),
        Some(op @ (OpReturnType::CompensationRequest | OpReturnType::ReimbursementRequest)) => {
            let has_candidate = temp.outputs.len() >= 3
                && temp.outputs[1].output_type == TxOutputType::IssuanceCandidate;
            if !has_candidate {
                return Err("funding request without issuance candidate at output 1".to_string());
            }
            Ok(if op == OpReturnType::CompensationRequest {
                TxType::CompensationRequest
            } else {
                TxType::ReimbursementRequest
            })
        }
        Some(OpReturnType::BlindVote) => Ok(TxType::BlindVote),
        Some(OpReturnType::VoteReveal) => Ok(TxType::VoteReveal),
        Some(OpReturnType::Lockup) => {
            if first_type != Some(TxOutputType::Lockup) {
                return Err("lockup tx without lockup output at index 0".to_string());
            }
            Ok(TxType::Lockup)
        }
        Some(OpReturnType::AssetListingFee) => Ok(TxType::AssetListingFee),
        Some(OpReturnType::ProofOfBurn) => Ok(TxType::ProofOfBurn),
        None if outputs.available > 0 => Ok(TxType::PayTradeFee),
        None if first_type == Some(TxOutputType::Unlock) => {
            if inputs.unlock_input == InputState::Valid {
                Ok(TxType::Unlock)
            } else {
                Err("unlock with more than one lockup input".to_string())
            }
        }
        None => Ok(TxType::Transfer),
    }
}

fn invalidate(temp: &mut TempTx, inputs: &InputResolution, reason: String) -> Option<DaoError> {
    warn!("tx {} invalid: {}", temp.id.short(), reason);
    for out in &mut temp.outputs {
        out.output_type = TxOutputType::PlainOutput;
    }
    temp.tx_type = Some(TxType::Invalid);
    temp.burnt_value = inputs.accumulated;
    Some(DaoError::StructuralInvalid { tx_id: temp.id, reason })
}
