//! Selkie JavaScript engine: embedding facade and module linking
