mod choice;
mod record;
