//! Replenishment order domain: line item sets, the draft diff engine and the
//! order lifecycle.

pub mod diff;
pub mod editor;
pub mod item_set;
pub mod order;
pub mod receipt;

pub use diff::{apply_diff, diff, diff_for_update, ChangeKind, ItemDiff, LineChange};
pub use editor::{EditorLine, OrderEditor};
pub use item_set::{OrderItemSet, OrderLineItem};
pub use order::{
    ApplyEdit, CancelOrder, DraftRevised, GoodsReceived, InitialStatus, Order, OrderCancelled, OrderCommand,
    OrderEvent, OrderPlaced, OrderRecord, OrderSent, OrderStatus, PendingRevised, PlaceOrder, ReceiveGoods,
    SendOrder,
};
pub use receipt::{Fulfilment, LineFulfilment, ReceiptEntry, ReceiptSubmission, ReceivedLine};
