mod dom;
