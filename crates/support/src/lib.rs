//! Support domain module: user-opened tickets with severity levels, worked
//! by capability-gated support agents.

pub mod ticket;

pub use ticket::{
    EscalateTicket, OpenTicket, ReplyToTicket, ResolveTicket, SupportTicket, TicketCommand,
    TicketEscalated, TicketEvent, TicketId, TicketOpened, TicketReplied, TicketResolved,
    TicketSeverity, TicketStatus,
};
