//! Core VM execution engine for Selkie: values, objects, interpreter, promises
