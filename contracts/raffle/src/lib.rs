#![cfg_attr(not(feature = "std"), no_std, no_main)]

/// # Interval Raffle
///
/// **Role:** Recurring, trust-minimized lottery. Participants deposit a fixed
/// entrance fee to join the current round; once the configured interval has
/// elapsed an off-chain automation actor triggers a draw; an external
/// randomness oracle delivers a random word asynchronously; the contract
/// picks one participant and transfers the entire pool to them, then resets
/// for the next round.
///
/// **Architecture:**
/// ```text
///   [keeper bot] ──poll check_upkeep()──► [Raffle] ──DrawRequested event──► [oracle]
///        │                                    ▲                                │
///        └──────── perform_upkeep() ──────────┘◄──── fulfill_random_words ─────┘
/// ```
///
/// The round is a two-state machine: `Open` (accepting entries) and
/// `Calculating` (draw requested, awaiting the oracle callback). Entries are
/// rejected while calculating; a second draw request while calculating is
/// rejected; a fulfillment is accepted only from the registered oracle
/// address and only for the pending request id. Payout and round reset are
/// one unit: if the winner transfer fails the bookkeeping is restored and
/// the round stays `Calculating`.
#[ink::contract]
mod raffle {
    use ink::prelude::vec::Vec;

    // =========================================================================
    // CONSTANTS
    // =========================================================================

    /// Block confirmations the oracle must wait for before sealing the seed
    /// of a randomness request. Announced with every `DrawRequested` event.
    pub const REQUEST_CONFIRMATIONS: u16 = 3;

    /// Random words requested per draw. Exactly one winner is selected, so
    /// only the first delivered word is consumed; extra words are ignored.
    pub const NUM_RANDOM_WORDS: u32 = 1;

    /// Identity of an in-flight randomness request. Minted locally as a
    /// monotonically increasing nonce, never reused across rounds.
    pub type RequestId = u64;

    // =========================================================================
    // ROUND STATE
    // =========================================================================

    /// Lifecycle state of the current round. The machine runs forever:
    /// `Open` → `Calculating` → `Open` → ...
    #[derive(Debug, Clone, Copy, PartialEq, Eq, scale::Encode, scale::Decode)]
    #[cfg_attr(
        feature = "std",
        derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
    )]
    pub enum RoundState {
        /// Accepting entries, eligible for a draw trigger.
        Open,
        /// Draw requested, awaiting randomness fulfillment.
        Calculating,
    }

    // =========================================================================
    // STORAGE
    // =========================================================================

    #[ink(storage)]
    pub struct Raffle {
        /// Fixed entry price. Set at construction, immutable thereafter.
        entrance_fee: Balance,

        /// Minimum time between draws, in milliseconds. A draw becomes
        /// eligible strictly *after* the interval has elapsed.
        interval: Timestamp,

        /// The only address allowed to deliver randomness fulfillments.
        randomness_oracle: AccountId,

        /// Current lifecycle state of the round.
        state: RoundState,

        /// Timestamp of construction or of the last completed draw.
        /// Updated only when a round resets.
        last_draw_timestamp: Timestamp,

        // ── Entry ledger ──────────────────────────────────────────────────
        /// Participants of the current round, in entry order. The index
        /// space for winner selection; cleared atomically on reset.
        participants: Vec<AccountId>,

        /// Sum of accepted deposits for the current round. Paid out in full
        /// to the winner, then zeroed.
        pool_balance: Balance,

        // ── Draw bookkeeping ──────────────────────────────────────────────
        /// Last minted request id. Strictly increasing across rounds.
        request_nonce: RequestId,

        /// Request id of the in-flight draw while `Calculating`.
        /// `None` while `Open`; at most one pending request at a time.
        pending_request_id: Option<RequestId>,

        /// Winner of the last completed round. Overwritten, never cleared.
        recent_winner: Option<AccountId>,
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Emitted when a deposit is accepted and a participant joins the round.
    #[ink(event)]
    pub struct RaffleEntered {
        #[ink(topic)]
        participant: AccountId,
        deposit: Balance,
        participant_count: u32,
    }

    /// Emitted when a draw is triggered and randomness is requested.
    /// Carries the trigger snapshot so the oracle and any observer can
    /// audit the request.
    #[ink(event)]
    pub struct DrawRequested {
        #[ink(topic)]
        request_id: RequestId,
        participant_count: u32,
        pool_balance: Balance,
        confirmations: u16,
        num_words: u32,
    }

    /// Emitted when a fulfillment completes: winner selected, pool paid
    /// out, round reset to `Open`.
    #[ink(event)]
    pub struct WinnerPicked {
        #[ink(topic)]
        request_id: RequestId,
        #[ink(topic)]
        winner: AccountId,
        prize: Balance,
    }

    // =========================================================================
    // ERRORS
    // =========================================================================

    #[derive(Debug, PartialEq, Eq, scale::Encode, scale::Decode)]
    #[cfg_attr(feature = "std", derive(scale_info::TypeInfo))]
    pub enum Error {
        /// Deposit below the fixed entrance fee.
        InsufficientDeposit,
        /// Entry or draw trigger attempted while the round is calculating.
        RoundNotOpen,
        /// Draw trigger fired before the preconditions held. Carries the
        /// observed snapshot for diagnostics.
        UpkeepNotNeeded {
            pool_balance: Balance,
            participant_count: u32,
            state: RoundState,
        },
        /// Fulfillment arrived while no draw was pending.
        NoDrawPending,
        /// Fulfillment caller is not the registered randomness oracle.
        CallerNotOracle,
        /// Fulfillment carried a request id other than the pending one.
        RequestIdMismatch,
        /// The oracle delivered an empty batch of random words.
        EmptyRandomWords,
        /// The prize transfer to the winner was rejected; the round stays
        /// `Calculating` and all bookkeeping is restored.
        PayoutFailed,
        /// Read accessor index beyond the participant count.
        IndexOutOfBounds,
        /// Arithmetic overflow.
        Overflow,
    }

    // =========================================================================
    // IMPLEMENTATION
    // =========================================================================

    impl Raffle {
        // ---------------------------------------------------------------------
        // Constructor
        // ---------------------------------------------------------------------

        /// Deploy a raffle with a fixed entrance fee, a draw interval in
        /// milliseconds and the oracle address trusted for fulfillments.
        ///
        /// The round starts `Open` with an empty ledger; the interval clock
        /// starts at deployment time.
        #[ink(constructor)]
        pub fn new(entrance_fee: Balance, interval: Timestamp, randomness_oracle: AccountId) -> Self {
            Self {
                entrance_fee,
                interval,
                randomness_oracle,
                state: RoundState::Open,
                last_draw_timestamp: Self::env().block_timestamp(),
                participants: Vec::new(),
                pool_balance: 0,
                request_nonce: 0,
                pending_request_id: None,
                recent_winner: None,
            }
        }

        // =====================================================================
        // ENTRY
        // =====================================================================

        /// Join the current round by depositing at least the entrance fee.
        ///
        /// The entire transferred value counts as the deposit and stays in
        /// the pool; no change is refunded for overpayment. Entries are
        /// rejected while a draw is in flight.
        #[ink(message, payable)]
        pub fn enter_raffle(&mut self) -> Result<(), Error> {
            if self.state != RoundState::Open {
                return Err(Error::RoundNotOpen);
            }

            let deposit = self.env().transferred_value();
            if deposit < self.entrance_fee {
                return Err(Error::InsufficientDeposit);
            }

            let participant = self.env().caller();
            self.participants.push(participant);
            self.pool_balance = self
                .pool_balance
                .checked_add(deposit)
                .ok_or(Error::Overflow)?;

            self.env().emit_event(RaffleEntered {
                participant,
                deposit,
                participant_count: self.participants.len() as u32,
            });

            Ok(())
        }

        // =====================================================================
        // UPKEEP — Trigger Evaluation
        // =====================================================================

        /// Read-only upkeep probe for off-chain keepers. True when a draw
        /// may start right now.
        #[ink(message)]
        pub fn check_upkeep(&self) -> bool {
            self.upkeep_needed(self.env().block_timestamp())
        }

        /// The draw precondition, a pure predicate over the storage
        /// snapshot. All four must hold:
        /// 1. round is `Open`;
        /// 2. strictly more than `interval` has passed since the last draw;
        /// 3. at least one participant;
        /// 4. a non-empty pool.
        fn upkeep_needed(&self, now: Timestamp) -> bool {
            let is_open = self.state == RoundState::Open;
            let interval_elapsed = now.saturating_sub(self.last_draw_timestamp) > self.interval;
            let has_participants = !self.participants.is_empty();
            let has_pool = self.pool_balance > 0;

            is_open && interval_elapsed && has_participants && has_pool
        }

        // =====================================================================
        // DRAW — Request
        // =====================================================================

        /// Start a draw. Callable by anyone; the keeper that observed
        /// `check_upkeep() == true` is expected to call this, and the
        /// predicate is re-evaluated here so a stale trigger fails closed.
        ///
        /// On success the round moves to `Calculating`, a fresh request id
        /// is minted and stored, and `DrawRequested` announces the request
        /// to the oracle. Participants persist until fulfillment.
        #[ink(message)]
        pub fn perform_upkeep(&mut self) -> Result<RequestId, Error> {
            if self.state != RoundState::Open {
                return Err(Error::RoundNotOpen);
            }

            let now = self.env().block_timestamp();
            if !self.upkeep_needed(now) {
                return Err(Error::UpkeepNotNeeded {
                    pool_balance: self.pool_balance,
                    participant_count: self.participants.len() as u32,
                    state: self.state,
                });
            }

            self.request_nonce = self.request_nonce.checked_add(1).ok_or(Error::Overflow)?;
            let request_id = self.request_nonce;

            self.state = RoundState::Calculating;
            self.pending_request_id = Some(request_id);

            self.env().emit_event(DrawRequested {
                request_id,
                participant_count: self.participants.len() as u32,
                pool_balance: self.pool_balance,
                confirmations: REQUEST_CONFIRMATIONS,
                num_words: NUM_RANDOM_WORDS,
            });

            Ok(request_id)
        }

        // =====================================================================
        // DRAW — Fulfillment
        // =====================================================================

        /// Oracle callback delivering the requested randomness. Accepted
        /// only from the registered oracle, only while `Calculating`, and
        /// only for the pending request id.
        ///
        /// Selects `words[0] mod participant_count` as the winner (the
        /// modulo bias for randomness domains not divisible by the
        /// participant count is accepted, not corrected), commits the full
        /// round reset, then transfers the entire pool to the winner as the
        /// last step. A re-entering recipient therefore sees an open round
        /// with an empty ledger. If the transfer fails, the reset is rolled
        /// back and the round stays `Calculating`.
        #[ink(message)]
        pub fn fulfill_random_words(
            &mut self,
            request_id: RequestId,
            random_words: Vec<u64>,
        ) -> Result<(), Error> {
            if self.env().caller() != self.randomness_oracle {
                return Err(Error::CallerNotOracle);
            }
            if self.state != RoundState::Calculating {
                return Err(Error::NoDrawPending);
            }
            if self.pending_request_id != Some(request_id) {
                return Err(Error::RequestIdMismatch);
            }

            let word = *random_words.first().ok_or(Error::EmptyRandomWords)?;

            // Entries are frozen while calculating, so the ledger is exactly
            // the one the draw was requested over.
            let count = self.participants.len() as u64;
            let winner_index = word.checked_rem(count).ok_or(Error::IndexOutOfBounds)? as usize;
            let winner = *self
                .participants
                .get(winner_index)
                .ok_or(Error::IndexOutOfBounds)?;

            // ── Bookkeeping first, transfer last ──────────────────────────
            let prize = self.pool_balance;
            let drained_participants = core::mem::take(&mut self.participants);
            let previous_winner = self.recent_winner;
            let previous_draw_timestamp = self.last_draw_timestamp;

            self.recent_winner = Some(winner);
            self.state = RoundState::Open;
            self.pending_request_id = None;
            self.pool_balance = 0;
            self.last_draw_timestamp = self.env().block_timestamp();

            if self.env().transfer(winner, prize).is_err() {
                // Reset and payout are one unit: restore every mutation.
                self.participants = drained_participants;
                self.recent_winner = previous_winner;
                self.state = RoundState::Calculating;
                self.pending_request_id = Some(request_id);
                self.pool_balance = prize;
                self.last_draw_timestamp = previous_draw_timestamp;
                return Err(Error::PayoutFailed);
            }

            self.env().emit_event(WinnerPicked {
                request_id,
                winner,
                prize,
            });

            Ok(())
        }

        // =====================================================================
        // VIEW FUNCTIONS
        // =====================================================================

        #[ink(message)]
        pub fn get_entrance_fee(&self) -> Balance {
            self.entrance_fee
        }

        #[ink(message)]
        pub fn get_interval(&self) -> Timestamp {
            self.interval
        }

        #[ink(message)]
        pub fn get_round_state(&self) -> RoundState {
            self.state
        }

        #[ink(message)]
        pub fn get_participant(&self, index: u32) -> Result<AccountId, Error> {
            self.participants
                .get(index as usize)
                .copied()
                .ok_or(Error::IndexOutOfBounds)
        }

        #[ink(message)]
        pub fn get_participant_count(&self) -> u32 {
            self.participants.len() as u32
        }

        #[ink(message)]
        pub fn get_pool_balance(&self) -> Balance {
            self.pool_balance
        }

        #[ink(message)]
        pub fn get_recent_winner(&self) -> Option<AccountId> {
            self.recent_winner
        }

        #[ink(message)]
        pub fn get_last_draw_timestamp(&self) -> Timestamp {
            self.last_draw_timestamp
        }

        #[ink(message)]
        pub fn get_pending_request_id(&self) -> Option<RequestId> {
            self.pending_request_id
        }

        #[ink(message)]
        pub fn get_randomness_oracle(&self) -> AccountId {
            self.randomness_oracle
        }

        #[ink(message)]
        pub fn get_request_confirmations(&self) -> u16 {
            REQUEST_CONFIRMATIONS
        }

        #[ink(message)]
        pub fn get_num_random_words(&self) -> u32 {
            NUM_RANDOM_WORDS
        }
    }

    // =========================================================================
    // UNIT TESTS
    // =========================================================================

}
