mod commands;
mod placeholder;
mod typing;
