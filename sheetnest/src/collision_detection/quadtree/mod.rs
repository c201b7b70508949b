mod qt_node;

#[doc(inline)]
pub use qt_node::QTNode;
