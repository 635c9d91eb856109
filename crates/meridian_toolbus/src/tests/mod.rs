mod fixtures;
mod tool_registry;
mod tools;
